//! Error taxonomy for the game core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::{Chips, SeatIndex, SeatState};

/// Why the action gateway refused a requested action. Locally
/// recoverable: the caller is told why and may retry within the same
/// turn.
#[derive(Clone, Debug, Deserialize, Error, PartialEq, Serialize)]
pub enum RejectedAction {
    #[error("not your turn")]
    NotYourTurn,
    #[error("no betting round in progress")]
    NoActionPending,
    #[error("cannot act while {state}")]
    NotActionable { state: SeatState },
    #[error("cannot check, ${owed} to call")]
    CheckWithBetPending { owed: Chips },
    #[error("nothing to call, check instead")]
    NothingToCall,
    #[error("bet must reach at least ${min}")]
    BetBelowMinimum { min: Chips },
    #[error("bet of ${amount} exceeds your stack of ${stack}")]
    BetExceedsStack { amount: Chips, stack: Chips },
    #[error("no seat {0} at this table")]
    UnknownSeat(SeatIndex),
}

/// Seat management failures.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TableError {
    #[error("table is full")]
    TableFull,
    #[error("{0} is already seated")]
    AlreadySeated(super::entities::PlayerName),
    #[error("{0} is not seated here")]
    NotSeated(super::entities::PlayerName),
}

/// Round lifecycle failures. An invariant violation is fatal to the
/// affected round: it is logged, the round aborts, and contributions
/// are refunded.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RoundError {
    #[error("need at least 2 players with chips")]
    NotEnoughPlayers,
    #[error("a hand needs at least one connected human player")]
    NoHumanPresent,
    #[error("hand already in progress")]
    HandInProgress,
    #[error("invariant violated: {details}")]
    InvariantViolation { details: String },
}
