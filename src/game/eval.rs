//! Hand evaluation: rank a 5-7 card set into a category plus tie-break
//! kickers, totally ordered so comparison and split detection are just
//! `Ord` on the score.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entities::{Card, Value};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum HandCategory {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "high card",
            Self::OnePair => "pair",
            Self::TwoPair => "two pair",
            Self::ThreeOfAKind => "three of a kind",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::FullHouse => "full house",
            Self::FourOfAKind => "four of a kind",
            Self::StraightFlush => "straight flush",
        };
        write!(f, "{repr}")
    }
}

/// The total-order key for a best five-card hand. The derived `Ord`
/// compares category first, then kickers lexicographically, which
/// matches standard Hold'em comparison; equal scores are a split.
#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HandScore {
    pub category: HandCategory,
    pub kickers: Vec<Value>,
}

impl HandScore {
    /// Human-readable description, e.g. "full house, Kings over 10s".
    #[must_use]
    pub fn describe(&self) -> String {
        fn name(v: Value) -> String {
            match v {
                14 => "Ace".to_string(),
                13 => "King".to_string(),
                12 => "Queen".to_string(),
                11 => "Jack".to_string(),
                v => v.to_string(),
            }
        }
        match self.category {
            HandCategory::StraightFlush if self.kickers.first() == Some(&14) => {
                "royal flush".to_string()
            }
            HandCategory::StraightFlush => {
                format!("straight flush, {} high", name(self.kickers[0]))
            }
            HandCategory::FourOfAKind => format!("four of a kind, {}s", name(self.kickers[0])),
            HandCategory::FullHouse => format!(
                "full house, {}s over {}s",
                name(self.kickers[0]),
                name(self.kickers[1])
            ),
            HandCategory::Flush => format!("flush, {} high", name(self.kickers[0])),
            HandCategory::Straight if self.kickers[0] == 5 => {
                "straight, 5 high (wheel)".to_string()
            }
            HandCategory::Straight => format!("straight, {} high", name(self.kickers[0])),
            HandCategory::ThreeOfAKind => {
                format!("three of a kind, {}s", name(self.kickers[0]))
            }
            HandCategory::TwoPair => format!(
                "two pair, {}s and {}s",
                name(self.kickers[0]),
                name(self.kickers[1])
            ),
            HandCategory::OnePair => format!("pair of {}s", name(self.kickers[0])),
            HandCategory::HighCard => format!("{} high", name(self.kickers[0])),
        }
    }
}

/// Highest straight formed by `values`, if any. The ace counts both
/// high and low, so A-2-3-4-5 scores as a 5-high straight.
fn straight_high(values: &[Value]) -> Option<Value> {
    let mut uniq: Vec<Value> = values.to_vec();
    uniq.sort_unstable_by(|a, b| b.cmp(a));
    uniq.dedup();
    if uniq.first() == Some(&14) {
        uniq.push(1);
    }
    let mut run = 1;
    for i in 1..uniq.len() {
        if uniq[i - 1] == uniq[i] + 1 {
            run += 1;
            if run >= 5 {
                return Some(uniq[i] + 4);
            }
        } else {
            run = 1;
        }
    }
    None
}

/// Score exactly five cards.
#[must_use]
pub fn eval_five(cards: &[Card; 5]) -> HandScore {
    let mut values: Vec<Value> = cards.iter().map(|c| c.0).collect();
    values.sort_unstable_by(|a, b| b.cmp(a));

    let mut counts = [0u8; 15];
    for &v in &values {
        counts[v as usize] += 1;
    }
    // (count, value) pairs, highest count first, ties broken by value.
    let mut groups: Vec<(u8, Value)> = (2..=14u8)
        .filter(|&v| counts[v as usize] > 0)
        .map(|v| (counts[v as usize], v))
        .collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = cards.iter().all(|c| c.1 == cards[0].1);
    let straight = straight_high(&values);

    if let Some(high) = straight
        && is_flush
    {
        return HandScore {
            category: HandCategory::StraightFlush,
            kickers: vec![high],
        };
    }

    if groups[0].0 == 4 {
        let quad = groups[0].1;
        let kicker = values.iter().copied().find(|&v| v != quad).unwrap_or(quad);
        return HandScore {
            category: HandCategory::FourOfAKind,
            kickers: vec![quad, kicker],
        };
    }

    if groups[0].0 == 3 && groups.len() > 1 && groups[1].0 >= 2 {
        return HandScore {
            category: HandCategory::FullHouse,
            kickers: vec![groups[0].1, groups[1].1],
        };
    }

    if is_flush {
        return HandScore {
            category: HandCategory::Flush,
            kickers: values,
        };
    }

    if let Some(high) = straight {
        return HandScore {
            category: HandCategory::Straight,
            kickers: vec![high],
        };
    }

    if groups[0].0 == 3 {
        let trips = groups[0].1;
        let mut kickers = vec![trips];
        kickers.extend(values.iter().copied().filter(|&v| v != trips).take(2));
        return HandScore {
            category: HandCategory::ThreeOfAKind,
            kickers,
        };
    }

    if groups[0].0 == 2 && groups.len() > 1 && groups[1].0 == 2 {
        let (high, low) = (groups[0].1, groups[1].1);
        let kicker = values
            .iter()
            .copied()
            .find(|&v| v != high && v != low)
            .unwrap_or(low);
        return HandScore {
            category: HandCategory::TwoPair,
            kickers: vec![high, low, kicker],
        };
    }

    if groups[0].0 == 2 {
        let pair = groups[0].1;
        let mut kickers = vec![pair];
        kickers.extend(values.iter().copied().filter(|&v| v != pair).take(3));
        return HandScore {
            category: HandCategory::OnePair,
            kickers,
        };
    }

    HandScore {
        category: HandCategory::HighCard,
        kickers: values,
    }
}

/// Score the five cards remaining after dropping up to two indices.
fn eval_without(cards: &[Card], skip_a: usize, skip_b: usize) -> HandScore {
    let mut five = [cards[0]; 5];
    let mut w = 0;
    for (i, &card) in cards.iter().enumerate() {
        if i != skip_a && i != skip_b {
            five[w] = card;
            w += 1;
        }
    }
    debug_assert_eq!(w, 5);
    eval_five(&five)
}

/// Score the best five-card combination of 5 to 7 cards (hole cards
/// plus whatever board has been revealed). Choosing 5 of n is the same
/// as dropping n - 5, so enumerate the dropped indices.
#[must_use]
pub fn best_hand(cards: &[Card]) -> HandScore {
    debug_assert!((5..=7).contains(&cards.len()));
    let n = cards.len();
    match n {
        5 => eval_without(cards, n, n),
        6 => {
            let mut best = eval_without(cards, 0, n);
            for skip in 1..n {
                let score = eval_without(cards, skip, n);
                if score > best {
                    best = score;
                }
            }
            best
        }
        _ => {
            let mut best = eval_without(cards, 0, 1);
            for skip_a in 0..n {
                for skip_b in skip_a + 1..n {
                    let score = eval_without(cards, skip_a, skip_b);
                    if score > best {
                        best = score;
                    }
                }
            }
            best
        }
    }
}
