//! Pot accounting: per-seat contributions, layered side pots, and
//! settlement payouts.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::entities::{Chips, SeatIndex};
use super::errors::RoundError;
use super::eval::HandScore;

/// One contested chip pool. The main pot always exists; side pots
/// appear only when differing all-in amounts partition contributions.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Pot {
    pub amount: Chips,
    /// Seats whose chips built this pot, folded or not.
    pub contributors: BTreeSet<SeatIndex>,
    /// Seats that can win this pot: contributors that have not folded.
    pub eligible: BTreeSet<SeatIndex>,
}

/// Tracks what every seat has put into the hand and computes payouts at
/// showdown. Folded seats lose their claim but their chips stay in the
/// pots they funded.
#[derive(Clone, Debug, Default)]
pub struct PotAccountant {
    contributions: BTreeMap<SeatIndex, Chips>,
    folded: BTreeSet<SeatIndex>,
}

impl PotAccountant {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_contribution(&mut self, seat: SeatIndex, amount: Chips) {
        *self.contributions.entry(seat).or_default() += amount;
    }

    pub fn mark_folded(&mut self, seat: SeatIndex) {
        self.folded.insert(seat);
    }

    #[must_use]
    pub fn contribution(&self, seat: SeatIndex) -> Chips {
        self.contributions.get(&seat).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> Chips {
        self.contributions.values().sum()
    }

    /// Build the main and side pots from the recorded contributions.
    /// Repeatedly takes the smallest remaining contribution level and
    /// forms a pot from that increment across everyone still owing it.
    #[must_use]
    pub fn pots(&self) -> Vec<Pot> {
        let mut remaining = self.contributions.clone();
        let mut pots = Vec::new();
        loop {
            let Some(level) = remaining.values().copied().filter(|&c| c > 0).min() else {
                break;
            };
            let contributors: Vec<SeatIndex> = remaining
                .iter()
                .filter(|&(_, &c)| c > 0)
                .map(|(&seat, _)| seat)
                .collect();
            let eligible: BTreeSet<SeatIndex> = contributors
                .iter()
                .copied()
                .filter(|seat| !self.folded.contains(seat))
                .collect();
            pots.push(Pot {
                amount: level * contributors.len() as Chips,
                contributors: contributors.iter().copied().collect(),
                eligible,
            });
            for seat in contributors {
                if let Some(c) = remaining.get_mut(&seat) {
                    *c -= level;
                }
            }
        }
        if pots.is_empty() {
            pots.push(Pot {
                amount: 0,
                contributors: BTreeSet::new(),
                eligible: BTreeSet::new(),
            });
        }
        pots
    }

    /// Pay out every pot to the best eligible hand(s) among its
    /// contributors. Ties split evenly; odd chips go clockwise starting
    /// from the first eligible winner after `anchor` (the forced-bet
    /// poster), which makes remainder assignment deterministic.
    ///
    /// Fails with an invariant violation if the payouts do not sum to
    /// the recorded pot total.
    pub fn settle(
        &self,
        scores: &BTreeMap<SeatIndex, HandScore>,
        anchor: SeatIndex,
        num_seats: usize,
    ) -> Result<BTreeMap<SeatIndex, Chips>, RoundError> {
        let mut payouts: BTreeMap<SeatIndex, Chips> = BTreeMap::new();
        for pot in self.pots() {
            if pot.amount == 0 {
                continue;
            }
            let best = pot
                .eligible
                .iter()
                .filter_map(|seat| scores.get(seat))
                .max();
            let Some(best) = best else {
                // Every claimant folded or forfeited this layer (an
                // over-bet nobody alive matched): the increment goes
                // back to whoever funded it.
                let level = pot.amount / pot.contributors.len().max(1) as Chips;
                for &seat in &pot.contributors {
                    *payouts.entry(seat).or_default() += level;
                }
                continue;
            };
            let mut winners: Vec<SeatIndex> = pot
                .eligible
                .iter()
                .copied()
                .filter(|seat| scores.get(seat) == Some(best))
                .collect();
            // Clockwise from the seat after the anchor.
            winners.sort_unstable_by_key(|&seat| (seat + num_seats - anchor - 1) % num_seats);

            let share = pot.amount / winners.len() as Chips;
            let remainder = pot.amount % winners.len() as Chips;
            for (i, seat) in winners.iter().enumerate() {
                let extra = u32::from((i as Chips) < remainder);
                *payouts.entry(*seat).or_default() += share + extra;
            }
        }

        let paid: Chips = payouts.values().sum();
        if paid != self.total() {
            return Err(RoundError::InvariantViolation {
                details: format!("paid ${paid} out of a ${} pot", self.total()),
            });
        }
        Ok(payouts)
    }

    /// Empty the accountant once its pots have been paid out or
    /// refunded, so stacks plus pot stay constant at every observable
    /// point.
    pub fn clear(&mut self) {
        self.contributions.clear();
        self.folded.clear();
    }

    /// Hand back every contribution as-is. Used when a round aborts:
    /// chips are returned to contributors rather than guessed at.
    #[must_use]
    pub fn refunds(&self) -> BTreeMap<SeatIndex, Chips> {
        self.contributions
            .iter()
            .filter(|&(_, &c)| c > 0)
            .map(|(&seat, &c)| (seat, c))
            .collect()
    }
}
