//! Ledger data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::entities::{Chips, PlayerName};

/// One seat's result for one hand, as reported to the ledger store.
/// Exactly one entry is emitted per dealt seat per hand; the
/// idempotency key makes retries after reported failures safe.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SettlementEntry {
    pub player: PlayerName,
    /// Chips won (positive) or lost (negative) over the hand.
    pub delta: i64,
    /// The stack the seat held when the hand was dealt. Always the
    /// observed value, never a default.
    pub balance_before: Chips,
    pub balance_after: Chips,
    pub hand_no: u64,
    pub idempotency_key: String,
    pub recorded_at: DateTime<Utc>,
}
