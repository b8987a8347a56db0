//! The settlement ledger seam. The engine never talks to a database;
//! it emits one settlement entry per dealt seat per hand through an
//! injected [`LedgerStore`]. Entries always carry the seat's actual
//! prior balance, so a store can detect drift instead of trusting an
//! assumed default. A failed write raises the room's reconciliation
//! flag and is retried; it never blocks the turn machine.
//!
//! Timing: writes are write-back at settlement only. While a player is
//! seated, the table's stack is the authority; `balance` is a
//! read-through for outer layers (lobby displays, reconciliation), not
//! something the engine consults mid-hand.

pub mod errors;
pub mod models;
pub mod store;

pub use errors::{LedgerError, LedgerResult};
pub use models::SettlementEntry;
pub use store::{LedgerStore, MemoryLedger};
