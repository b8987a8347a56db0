//! Room mailbox message types, responses, and the observer-specific
//! state snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::game::entities::{
    Action, AppliedAction, Card, Chips, PlayerName, SeatBacking, SeatIndex, SeatState,
};
use crate::game::errors::{RejectedAction, RoundError, TableError};
use crate::game::pots::Pot;
use crate::game::round::{Phase, RoundEvent};

/// Room-level failures surfaced to sessions.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RoomError {
    #[error("room not found")]
    RoomNotFound,
    #[error("room code already in use")]
    CodeCollision,
    #[error("room is closed")]
    RoomClosed,
    #[error("invalid room config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Round(#[from] RoundError),
    #[error(transparent)]
    Rejected(#[from] RejectedAction),
}

/// Messages a room actor consumes from its mailbox. Everything that
/// mutates a room flows through here, one message at a time.
#[derive(Debug)]
pub enum RoomMessage {
    /// Claim a seat for an identity.
    Seat {
        name: PlayerName,
        respond: oneshot::Sender<Result<SeatIndex, RoomError>>,
    },

    /// Leave the table (deferred to hand end if the seat is live).
    Leave {
        name: PlayerName,
        respond: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Start dealing hands. Stays in force until conditions fail.
    Start {
        name: PlayerName,
        respond: oneshot::Sender<Result<(), RoomError>>,
    },

    /// An action from a session.
    Act {
        name: PlayerName,
        action: Action,
        respond: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Observer-specific state snapshot.
    Snapshot {
        observer: Option<PlayerName>,
        respond: oneshot::Sender<RoomSnapshot>,
    },

    /// Subscribe to per-action state updates.
    Subscribe {
        name: PlayerName,
        sender: mpsc::Sender<RoomUpdate>,
    },

    /// Drop a subscription.
    Unsubscribe { name: PlayerName },

    /// Transport lost the session behind an identity.
    Disconnected { name: PlayerName },

    /// The identity's session came back.
    Reconnected { name: PlayerName },

    /// Push the room's expiry out by another extension window.
    Extend {
        respond: oneshot::Sender<Option<DateTime<Utc>>>,
    },

    /// Shut the room down.
    Close { respond: oneshot::Sender<()> },

    /// Internal: a background AI query finished. Ignored unless the
    /// serial still matches the live turn.
    AiDecision {
        serial: u64,
        seat: SeatIndex,
        action: Action,
    },
}

/// One seat as an observer sees it. Hole cards are only present for
/// the observer's own seat; showdown reveals travel in events.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SeatView {
    pub seat: SeatIndex,
    pub name: PlayerName,
    pub chips: Chips,
    pub state: SeatState,
    pub backing: SeatBacking,
    pub street_contribution: Chips,
    pub total_contribution: Chips,
    pub is_turn: bool,
    pub cards: Option<Vec<Card>>,
}

/// Full room state for one observer, broadcast after every applied
/// action and available on demand.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RoomSnapshot {
    pub room: String,
    pub hand_no: u64,
    pub phase: Option<Phase>,
    pub community: Vec<Card>,
    pub pots: Vec<Pot>,
    pub pot_total: Chips,
    pub seats: Vec<SeatView>,
    pub turn: Option<SeatIndex>,
    pub deadline: Option<DateTime<Utc>>,
    /// Raised while settlement writes are queued for retry after a
    /// ledger failure.
    pub needs_reconciliation: bool,
}

impl RoomSnapshot {
    /// Render for a transport collaborator that speaks JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// What subscribers receive: the action that triggered the update (if
/// any), the engine events it produced, and a fresh personal snapshot.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RoomUpdate {
    pub applied: Option<AppliedAction>,
    pub events: Vec<RoundEvent>,
    pub snapshot: RoomSnapshot,
}
