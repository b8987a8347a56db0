//! Crate-wide game constants.

use super::entities::Chips;

/// Maximum number of seats at a table.
pub const MAX_SEATS: usize = 8;

/// Community board size once the river is dealt.
pub const BOARD_SIZE: usize = 5;

/// Default stack a player sits down with.
pub const DEFAULT_STARTING_STACK: Chips = 200;

/// Default forced bet posted by the button seat at preflop entry.
pub const DEFAULT_FORCED_BET: Chips = 10;

/// Default window a turn holder has to act before the scheduler
/// synthesizes an action.
pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 60;

/// Share-code rooms live this long unless extended.
pub const DEFAULT_ROOM_TTL_SECS: u64 = 30 * 60;

/// Each `extend` request adds this much to a room's lifetime.
pub const ROOM_EXTENSION_SECS: u64 = 30 * 60;

/// Length of generated room share codes.
pub const ROOM_CODE_LENGTH: usize = 6;

/// Maximum length of a player display name.
pub const MAX_NAME_LENGTH: usize = 16;

/// Display names used when backfilling a table with AI-backed seats.
pub const AI_SEAT_NAMES: [&str; 5] = ["ai_ada", "ai_bo", "ai_cleo", "ai_dex", "ai_eve"];
