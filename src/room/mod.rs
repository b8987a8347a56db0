//! Rooms: the unit of concurrency. Each room owns one table, a
//! roster, a broadcast fan-out, a turn deadline, and an expiry timer,
//! all serialized behind a tokio mailbox. The registry owns the rooms.
//!
//! ## Architecture
//!
//! Each room runs in its own tokio task with an mpsc inbox. Actions
//! targeting different rooms proceed in parallel; actions targeting
//! the same room apply one at a time, which is what upholds the
//! engine's single-writer guarantee. AI turns are satisfied by
//! time-boxed background queries racing the turn deadline; the loser
//! of the race is discarded by turn serial.

pub mod actor;
pub mod config;
pub mod messages;
pub mod registry;
mod scheduler;

pub use actor::{RoomActor, RoomHandle};
pub use config::RoomConfig;
pub use messages::{RoomError, RoomMessage, RoomSnapshot, RoomUpdate, SeatView};
pub use registry::{RoomCode, RoomMeta, RoomRegistry};
