//! # Holdem Rooms
//!
//! A multi-room, multi-session Texas Hold'em engine: a turn-based
//! state machine that enforces betting rules, tracks main and side
//! pots, resolves showdowns, and mixes human and AI-controlled seats
//! under real-time turn deadlines.
//!
//! The crate guarantees, at every observable point:
//!
//! - **Chip conservation**: stacks plus pots are constant within a
//!   hand; settlement redistributes the pots exactly.
//! - **Single turn ownership**: at most one seat holds the turn, and
//!   only that seat's action can be accepted.
//! - **Side-pot correctness** under arbitrary all-in sequences.
//! - **Deterministic progress**: a turn deadline always resolves, even
//!   when a participant (human or AI) never responds.
//!
//! Transport, rendering, durable ledger storage, and AI reasoning are
//! external collaborators behind traits and message types.
//!
//! ## Core Modules
//!
//! - [`game`]: cards, hand evaluation, pots, the round state machine
//!   with its action gateway, and table seating.
//! - [`room`]: per-room actors, the turn scheduler, broadcast
//!   snapshots, and the process-wide registry.
//! - [`ai`]: the strategy request/response contract, response
//!   coercion, and the built-in heuristic fallback.
//! - [`ledger`]: the injected settlement store seam.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use holdem_rooms::{
//!     ai::HeuristicStrategy,
//!     ledger::MemoryLedger,
//!     room::{RoomConfig, RoomRegistry},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = RoomRegistry::new(
//!         Arc::new(HeuristicStrategy::default()),
//!         Arc::new(MemoryLedger::new()),
//!     );
//!     let room = registry.create(RoomConfig::default(), None).await?;
//!     room.seat("alice".into()).await?;
//!     room.start("alice".into()).await?;
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod game;
pub mod ledger;
pub mod room;

pub use game::{
    Action, Card, Chips, LegalActions, Phase, PlayerName, RejectedAction, SeatBacking, SeatIndex,
    SeatState, constants,
};
pub use room::{RoomCode, RoomConfig, RoomError, RoomHandle, RoomRegistry, RoomSnapshot};
