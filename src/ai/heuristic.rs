//! Built-in fallback strategy: a cheap hand-strength heuristic with a
//! little randomness. Used whenever the injected strategy is missing,
//! errors out, or blows its time budget, so AI seats always keep the
//! game moving.

use async_trait::async_trait;
use rand::Rng;

use super::{AiActionKind, AiRequest, AiResponse, AiStrategy, AiUnavailable};
use crate::game::entities::{Card, Chips};
use crate::game::eval::{self, HandCategory};

// Baseline strength per made-hand category.
const STRENGTH_HIGH_CARD: f32 = 0.1;
const STRENGTH_ONE_PAIR: f32 = 0.25;
const STRENGTH_TWO_PAIR: f32 = 0.40;
const STRENGTH_THREE_OF_A_KIND: f32 = 0.55;
const STRENGTH_STRAIGHT: f32 = 0.70;
const STRENGTH_FLUSH: f32 = 0.75;
const STRENGTH_FULL_HOUSE: f32 = 0.85;
const STRENGTH_FOUR_OF_A_KIND: f32 = 0.95;
const STRENGTH_STRAIGHT_FLUSH: f32 = 0.99;

/// Thresholds for the heuristic's three-way split: fold below, raise
/// above, call or check in between.
#[derive(Clone, Debug)]
pub struct HeuristicStrategy {
    fold_below: f32,
    raise_above: f32,
    /// Pot odds better than this nudge the strength up, so the bot
    /// does not fold getting 4:1 on a cheap call.
    pot_odds_bonus_threshold: f32,
    pot_odds_bonus: f32,
    jitter: f32,
}

impl Default for HeuristicStrategy {
    fn default() -> Self {
        Self {
            fold_below: 0.25,
            raise_above: 0.55,
            pot_odds_bonus_threshold: 0.25,
            pot_odds_bonus: 0.15,
            jitter: 0.08,
        }
    }
}

impl HeuristicStrategy {
    /// Rough [0, 1] strength of two hole cards before the flop.
    fn preflop_strength(hole: &[Card]) -> f32 {
        let (a, b) = (hole[0], hole[1]);
        let (hi, lo) = (a.0.max(b.0), a.0.min(b.0));
        let mut strength = f32::from(hi) / 28.0 + f32::from(lo) / 56.0;
        if a.0 == b.0 {
            strength += 0.35;
        }
        if a.1 == b.1 {
            strength += 0.05;
        }
        if hi - lo == 1 {
            strength += 0.04;
        }
        strength.min(0.99)
    }

    /// Strength of the best made hand once a board exists.
    fn made_strength(hole: &[Card], community: &[Card]) -> f32 {
        let mut cards = hole.to_vec();
        cards.extend_from_slice(community);
        let score = eval::best_hand(&cards);
        let base = match score.category {
            HandCategory::HighCard => STRENGTH_HIGH_CARD,
            HandCategory::OnePair => STRENGTH_ONE_PAIR,
            HandCategory::TwoPair => STRENGTH_TWO_PAIR,
            HandCategory::ThreeOfAKind => STRENGTH_THREE_OF_A_KIND,
            HandCategory::Straight => STRENGTH_STRAIGHT,
            HandCategory::Flush => STRENGTH_FLUSH,
            HandCategory::FullHouse => STRENGTH_FULL_HOUSE,
            HandCategory::FourOfAKind => STRENGTH_FOUR_OF_A_KIND,
            HandCategory::StraightFlush => STRENGTH_STRAIGHT_FLUSH,
        };
        // A top kicker is worth a nudge within the category.
        base + score.kickers.first().map_or(0.0, |&k| f32::from(k) / 150.0)
    }

    fn strength(&self, request: &AiRequest) -> f32 {
        let mut rng = rand::rng();
        let raw = if request.community.len() >= 3 {
            Self::made_strength(&request.hole_cards, &request.community)
        } else {
            Self::preflop_strength(&request.hole_cards)
        };
        let jitter = rng.random_range(-self.jitter..=self.jitter);
        (raw + jitter).clamp(0.0, 1.0)
    }

    fn pot_odds(request: &AiRequest) -> f32 {
        let call = request.legal.call_amount;
        if call == 0 {
            return 0.0;
        }
        call as f32 / (request.pot_size + call) as f32
    }
}

#[async_trait]
impl AiStrategy for HeuristicStrategy {
    async fn decide(&self, request: AiRequest) -> Result<AiResponse, AiUnavailable> {
        if request.hole_cards.len() != 2 {
            return Err(AiUnavailable("expected two hole cards".to_string()));
        }
        let mut strength = self.strength(&request);
        let odds = Self::pot_odds(&request);
        if odds > 0.0 && odds < self.pot_odds_bonus_threshold {
            strength += self.pot_odds_bonus;
        }

        if strength >= self.raise_above && request.legal.can_bet() {
            // Bet about half the pot, within the legal window.
            let target: Chips = request.pot_size / 2;
            let amount = target.clamp(request.legal.min_raise_to, request.legal.max_bet_to);
            return Ok(AiResponse {
                kind: AiActionKind::Bet,
                amount: Some(amount),
            });
        }
        if request.legal.can_check() {
            return Ok(AiResponse {
                kind: AiActionKind::Check,
                amount: None,
            });
        }
        if strength >= self.fold_below {
            return Ok(AiResponse {
                kind: AiActionKind::Call,
                amount: None,
            });
        }
        Ok(AiResponse {
            kind: AiActionKind::Fold,
            amount: None,
        })
    }
}
