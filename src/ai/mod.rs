//! The AI collaborator contract. The engine does not care how a
//! strategy reasons; it hands over a request with the legal action
//! bounds and a time budget, and coerces whatever comes back into a
//! legal action rather than rejecting it outright.

pub mod heuristic;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::entities::{Action, Card, Chips, LegalActions};
use crate::game::round::Phase;

pub use heuristic::HeuristicStrategy;

/// Everything a strategy gets to see for one decision.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AiRequest {
    pub phase: Phase,
    pub community: Vec<Card>,
    pub hole_cards: Vec<Card>,
    pub legal: LegalActions,
    pub pot_size: Chips,
    pub stack: Chips,
    /// How long the caller will wait before the turn scheduler's
    /// synthetic action wins the race.
    pub time_budget: Duration,
}

/// The kind half of a strategy's answer; `amount` only matters for
/// bets.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum AiActionKind {
    Fold,
    Check,
    Call,
    Bet,
}

/// A strategy's answer. May be out of bounds or nonsensical; see
/// [`coerce_response`].
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct AiResponse {
    pub kind: AiActionKind,
    pub amount: Option<Chips>,
}

/// The strategy collaborator was unreachable or failed. Round play
/// continues with a fallback; this never blocks the turn machine.
#[derive(Debug, Error)]
#[error("ai strategy unavailable: {0}")]
pub struct AiUnavailable(pub String);

/// Decides an action for an AI-backed seat. Implementations may be
/// slow or remote; the room time-boxes the call and discards answers
/// that lose the race against the turn deadline.
#[async_trait]
pub trait AiStrategy: Send + Sync {
    async fn decide(&self, request: AiRequest) -> Result<AiResponse, AiUnavailable>;
}

/// Map a strategy response onto the nearest legal action. Malformed or
/// out-of-bound responses degrade to check when free, fold when not,
/// so a misbehaving strategy can never stall or corrupt a round.
#[must_use]
pub fn coerce_response(legal: &LegalActions, response: &AiResponse) -> Action {
    let default = if legal.can_check() {
        Action::Check
    } else {
        Action::Fold
    };
    match response.kind {
        AiActionKind::Fold => Action::Fold,
        AiActionKind::Check => default,
        AiActionKind::Call => {
            if legal.can_check() {
                Action::Check
            } else {
                Action::Call
            }
        }
        AiActionKind::Bet => {
            let Some(amount) = response.amount else {
                return default;
            };
            if !legal.can_bet() {
                // Cannot raise (stack too short): calling all-in is the
                // nearest legal move if chips are owed.
                return if legal.call_amount > 0 {
                    Action::Call
                } else {
                    default
                };
            }
            Action::Bet(amount.clamp(legal.min_raise_to, legal.max_bet_to))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legal(call_amount: Chips, min_raise_to: Chips, max_bet_to: Chips) -> LegalActions {
        LegalActions {
            call_amount,
            min_raise_to,
            max_bet_to,
        }
    }

    fn respond(kind: AiActionKind, amount: Option<Chips>) -> AiResponse {
        AiResponse { kind, amount }
    }

    #[test]
    fn check_with_bet_pending_coerces_to_fold() {
        let action = coerce_response(&legal(50, 100, 200), &respond(AiActionKind::Check, None));
        assert_eq!(action, Action::Fold);
    }

    #[test]
    fn call_with_nothing_owed_coerces_to_check() {
        let action = coerce_response(&legal(0, 10, 200), &respond(AiActionKind::Call, None));
        assert_eq!(action, Action::Check);
    }

    #[test]
    fn bet_amounts_clamp_into_bounds() {
        let l = legal(0, 10, 200);
        assert_eq!(
            coerce_response(&l, &respond(AiActionKind::Bet, Some(3))),
            Action::Bet(10)
        );
        assert_eq!(
            coerce_response(&l, &respond(AiActionKind::Bet, Some(5000))),
            Action::Bet(200)
        );
        assert_eq!(
            coerce_response(&l, &respond(AiActionKind::Bet, Some(60))),
            Action::Bet(60)
        );
    }

    #[test]
    fn bet_without_amount_degrades() {
        assert_eq!(
            coerce_response(&legal(0, 10, 200), &respond(AiActionKind::Bet, None)),
            Action::Check
        );
        assert_eq!(
            coerce_response(&legal(40, 80, 200), &respond(AiActionKind::Bet, None)),
            Action::Fold
        );
    }

    #[test]
    fn bet_with_short_stack_becomes_a_call() {
        // Owes 40 but can only reach 60 total, under the 80 minimum.
        let action = coerce_response(&legal(40, 80, 60), &respond(AiActionKind::Bet, Some(80)));
        assert_eq!(action, Action::Call);
    }
}
