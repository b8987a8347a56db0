use rand::seq::SliceRandom;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::constants;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

pub const SUITS: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Diamond => "♦",
            Self::Heart => "♥",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Card rank. 2..=14, where 11..=14 are J/Q/K/A. Aces are stored high;
/// the evaluator treats them as low only when forming a wheel straight.
pub type Value = u8;

/// A card is a tuple of a rank value and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            14 => "A".to_string(),
            13 => "K".to_string(),
            12 => "Q".to_string(),
            11 => "J".to_string(),
            v => v.to_string(),
        };
        write!(f, "{value}{}", self.1)
    }
}

/// The 52-card dealing source for one hand. Reshuffled at every deal;
/// the cursor guarantees no card is dealt twice within a hand.
#[derive(Debug)]
pub struct Deck {
    cards: [Card; 52],
    cursor: usize,
}

impl Default for Deck {
    fn default() -> Self {
        let cards = std::array::from_fn(|i| Card(2 + (i / 4) as Value, SUITS[i % 4]));
        Self { cards, cursor: 0 }
    }
}

impl Deck {
    #[must_use]
    pub fn shuffled() -> Self {
        let mut deck = Self::default();
        deck.shuffle();
        deck
    }

    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut rand::rng());
        self.cursor = 0;
    }

    pub fn deal(&mut self) -> Card {
        let card = self.cards[self.cursor];
        self.cursor += 1;
        card
    }

    /// Discard the top card. Done before each street, as tradition demands.
    pub fn burn(&mut self) {
        self.cursor += 1;
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        52 - self.cursor
    }
}

/// Type alias for chip amounts. Stacks, bets, and pots are whole chips;
/// a `u32` covers any plausible table.
pub type Chips = u32;

/// Type alias for seat positions at a table. Stable for the lifetime of
/// a seating; players reference their own seat index instead of holding
/// back-pointers into the room.
pub type SeatIndex = usize;

/// Display identity of a participant. Whitespace collapses to
/// underscores and overly long names are truncated.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(s: &str) -> Self {
        let mut name: String = s
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .collect();
        name.truncate(constants::MAX_NAME_LENGTH);
        Self(name)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Seat lifecycle state. `Seated` players are between hands; `Active`
/// players can still act in the current hand.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SeatState {
    Seated,
    Active,
    Folded,
    AllIn,
    SittingOut,
    Disconnected,
}

impl fmt::Display for SeatState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Seated => "seated",
            Self::Active => "active",
            Self::Folded => "folded",
            Self::AllIn => "all-in",
            Self::SittingOut => "sitting out",
            Self::Disconnected => "disconnected",
        };
        write!(f, "{repr}")
    }
}

/// What answers for a seat when the turn reaches it: a remote session,
/// or the room's AI strategy. One Player type either way; game logic
/// never branches on this outside the room actor.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SeatBacking {
    Human,
    Ai,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub name: PlayerName,
    pub seat_idx: SeatIndex,
    pub chips: Chips,
    pub cards: Vec<Card>,
    pub state: SeatState,
    pub backing: SeatBacking,
}

impl Player {
    #[must_use]
    pub fn new(name: PlayerName, seat_idx: SeatIndex, chips: Chips, backing: SeatBacking) -> Self {
        Self {
            name,
            seat_idx,
            chips,
            cards: Vec::with_capacity(2),
            state: SeatState::Seated,
            backing,
        }
    }

    /// Whether this seat still holds live cards in the current hand.
    #[must_use]
    pub fn is_in_hand(&self) -> bool {
        matches!(self.state, SeatState::Active | SeatState::AllIn)
    }

    /// Whether this seat may be handed the turn.
    #[must_use]
    pub fn can_act(&self) -> bool {
        self.state == SeatState::Active
    }

    /// Whether a session is present behind this seat.
    #[must_use]
    pub fn is_present_human(&self) -> bool {
        self.backing == SeatBacking::Human
            && !matches!(self.state, SeatState::Disconnected | SeatState::SittingOut)
    }

    /// Clear per-hand state. Chips and seat survive across hands.
    pub fn reset_for_hand(&mut self) {
        self.cards.clear();
        if !matches!(self.state, SeatState::Disconnected | SeatState::SittingOut) {
            self.state = SeatState::Seated;
        }
    }
}

/// An action a session or strategy may request.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    Fold,
    Check,
    Call,
    /// Bet to a new street total. Covers both opening bets and raises.
    Bet(Chips),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Fold => write!(f, "folds"),
            Self::Check => write!(f, "checks"),
            Self::Call => write!(f, "calls"),
            Self::Bet(amount) => write!(f, "bets ${amount}"),
        }
    }
}

/// A successfully applied action, as recorded and broadcast.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AppliedAction {
    pub seat: SeatIndex,
    pub action: Action,
    /// True when the scheduler or a disconnect synthesized the action.
    pub synthetic: bool,
    pub at: chrono::DateTime<chrono::Utc>,
}

/// The legal action set for the current turn holder, with bounds.
/// Shared with sessions for prompting and with the AI strategy as part
/// of its request contract.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct LegalActions {
    /// Chips the holder must add to match the bet-to-call. Zero means
    /// checking is legal.
    pub call_amount: Chips,
    /// Smallest street total a bet may name, unless it is exactly
    /// all-in for less.
    pub min_raise_to: Chips,
    /// Street total when the holder pushes their whole stack.
    pub max_bet_to: Chips,
}

impl LegalActions {
    #[must_use]
    pub fn can_check(&self) -> bool {
        self.call_amount == 0
    }

    /// Whether any raise is possible at all.
    #[must_use]
    pub fn can_bet(&self) -> bool {
        self.max_bet_to >= self.min_raise_to
    }
}

impl fmt::Display for LegalActions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.can_check() {
            write!(f, "check, bet (>= ${}), or fold", self.min_raise_to)
        } else {
            write!(
                f,
                "call (== ${}), bet (>= ${}), or fold",
                self.call_amount, self.min_raise_to
            )
        }
    }
}
