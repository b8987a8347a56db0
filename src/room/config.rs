//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::game::constants::{
    DEFAULT_FORCED_BET, DEFAULT_ROOM_TTL_SECS, DEFAULT_STARTING_STACK, DEFAULT_TURN_TIMEOUT_SECS,
    MAX_SEATS,
};
use crate::game::entities::Chips;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoomConfig {
    /// Display name shown in room listings.
    pub name: String,

    /// Number of seats at the table.
    pub max_seats: usize,

    /// Forced bet posted by the button at preflop entry.
    pub forced_bet: Chips,

    /// Stack a player sits down with.
    pub starting_stack: Chips,

    /// How long a turn holder has before the scheduler acts for them.
    pub turn_timeout: Duration,

    /// On `start`, backfill with AI-backed seats until this many
    /// players are present. Zero disables backfill.
    pub ai_fill_to: usize,

    /// How long the room lives unless extended. `None` never expires.
    pub ttl: Option<Duration>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            name: "holdem".to_string(),
            max_seats: MAX_SEATS,
            forced_bet: DEFAULT_FORCED_BET,
            starting_stack: DEFAULT_STARTING_STACK,
            turn_timeout: Duration::from_secs(DEFAULT_TURN_TIMEOUT_SECS),
            ai_fill_to: 4,
            ttl: Some(Duration::from_secs(DEFAULT_ROOM_TTL_SECS)),
        }
    }
}

impl RoomConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_seats < 2 || self.max_seats > MAX_SEATS {
            return Err(format!("max_seats must be between 2 and {MAX_SEATS}"));
        }
        if self.forced_bet == 0 {
            return Err("forced_bet must be positive".to_string());
        }
        if self.starting_stack < self.forced_bet {
            return Err("starting_stack must cover the forced bet".to_string());
        }
        if self.ai_fill_to > self.max_seats {
            return Err("ai_fill_to cannot exceed max_seats".to_string());
        }
        if self.turn_timeout < Duration::from_millis(10) {
            return Err("turn_timeout is too short".to_string());
        }
        Ok(())
    }
}
