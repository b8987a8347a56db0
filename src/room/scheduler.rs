//! The turn scheduler: one armed deadline per room, tied to a specific
//! turn by serial number.
//!
//! The room actor races the deadline against real actions in its
//! `select!` loop. Whichever resolves first wins; the loser is
//! discarded by serial mismatch, so a late timer or a late AI answer
//! can never double-apply onto the next turn.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

#[derive(Debug)]
pub(crate) struct TurnScheduler {
    window: Duration,
    armed: Option<(u64, Instant)>,
}

impl TurnScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed: None,
        }
    }

    /// Arm the deadline for one specific turn. Returns the wall-clock
    /// deadline for snapshots.
    pub fn arm(&mut self, serial: u64) -> DateTime<Utc> {
        self.armed = Some((serial, Instant::now() + self.window));
        Utc::now() + chrono::Duration::milliseconds(self.window.as_millis() as i64)
    }

    /// Cancelled the instant a real action applies for the turn.
    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.map(|(_, at)| at)
    }

    /// Which turn the armed deadline belongs to, if any.
    pub fn armed_serial(&self) -> Option<u64> {
        self.armed.map(|(serial, _)| serial)
    }

    /// Take the armed serial when the deadline fires. The caller
    /// checks it against the engine's live serial before synthesizing
    /// anything.
    pub fn fire(&mut self) -> Option<u64> {
        self.armed.take().map(|(serial, _)| serial)
    }
}
