//! A table: a concrete seating of players around one round engine.
//! Seats keep their indices for the lifetime of the table; the table
//! persists across hands while rounds come and go.

use std::collections::{BTreeMap, BTreeSet};

use log::info;

use super::entities::{
    Action, AppliedAction, Chips, LegalActions, Player, PlayerName, SeatBacking, SeatIndex,
    SeatState,
};
use super::errors::{RejectedAction, RoundError, TableError};
use super::round::{Round, RoundEvent};

/// Per-seat ledger delta for one settled hand. `balance_before` is the
/// stack the seat actually held when the hand was dealt, never an
/// assumed default.
#[derive(Clone, Debug)]
pub struct SeatDelta {
    pub seat: SeatIndex,
    pub name: PlayerName,
    pub delta: i64,
    pub balance_before: Chips,
    pub balance_after: Chips,
}

/// Everything the room needs after a hand settles: ledger deltas for
/// each dealt seat and players whose deferred departure completed.
#[derive(Clone, Debug)]
pub struct HandOutcome {
    pub hand_no: u64,
    pub aborted: bool,
    pub deltas: Vec<SeatDelta>,
    pub departed: Vec<(PlayerName, Chips)>,
}

/// How a leave request resolved: immediately between hands, or
/// deferred until the live hand ends.
#[derive(Clone, Debug)]
pub enum LeaveOutcome {
    Immediate { seat: SeatIndex, chips: Chips },
    Deferred { seat: SeatIndex },
}

#[derive(Debug)]
pub struct Table {
    seats: Vec<Option<Player>>,
    button: SeatIndex,
    hand_no: u64,
    forced_bet: Chips,
    round: Option<Round>,
    /// Stacks recorded when the current hand was dealt, for settlement
    /// deltas.
    stacks_at_deal: BTreeMap<SeatIndex, Chips>,
    /// Seats that asked to leave mid-hand; removed when it settles.
    pending_leaves: BTreeSet<SeatIndex>,
    /// All-in seats that disconnected mid-hand; they stay eligible for
    /// the pots they funded and flip to disconnected afterwards.
    pending_disconnects: BTreeSet<SeatIndex>,
}

impl Table {
    #[must_use]
    pub fn new(max_seats: usize, forced_bet: Chips) -> Self {
        Self {
            seats: vec![None; max_seats],
            button: 0,
            hand_no: 0,
            forced_bet,
            round: None,
            stacks_at_deal: BTreeMap::new(),
            pending_leaves: BTreeSet::new(),
            pending_disconnects: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn seats(&self) -> &[Option<Player>] {
        &self.seats
    }

    #[must_use]
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    #[must_use]
    pub fn hand_no(&self) -> u64 {
        self.hand_no
    }

    #[must_use]
    pub fn seat_of(&self, name: &PlayerName) -> Option<SeatIndex> {
        self.seats
            .iter()
            .flatten()
            .find(|p| &p.name == name)
            .map(|p| p.seat_idx)
    }

    #[must_use]
    pub fn player(&self, seat: SeatIndex) -> Option<&Player> {
        self.seats.get(seat).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn occupied(&self) -> impl Iterator<Item = &Player> {
        self.seats.iter().flatten()
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.occupied().count()
    }

    #[must_use]
    pub fn human_count(&self) -> usize {
        self.occupied()
            .filter(|p| p.backing == SeatBacking::Human)
            .count()
    }

    /// Whether a new hand could be dealt right now.
    #[must_use]
    pub fn can_deal(&self) -> bool {
        self.round.is_none()
            && self
                .occupied()
                .filter(|p| p.state == SeatState::Seated && p.chips > 0)
                .count()
                >= 2
            && self.occupied().any(Player::is_present_human)
    }

    /// Claim a seat. Rejected when the identity is already seated or
    /// every seat is taken. A mid-hand claim is fine: the player is
    /// dealt in from the next hand.
    pub fn seat_player(
        &mut self,
        name: PlayerName,
        chips: Chips,
        backing: SeatBacking,
    ) -> Result<SeatIndex, TableError> {
        if self.seat_of(&name).is_some() {
            return Err(TableError::AlreadySeated(name));
        }
        let seat = self
            .seats
            .iter()
            .position(Option::is_none)
            .ok_or(TableError::TableFull)?;
        info!("{name} takes seat {seat} with ${chips}");
        self.seats[seat] = Some(Player::new(name, seat, chips, backing));
        Ok(seat)
    }

    /// Leave the table. Between hands the seat empties immediately and
    /// the stack is returned; mid-hand the live hand is forfeited and
    /// removal waits for settlement so the pots stay intact.
    pub fn leave(
        &mut self,
        name: &PlayerName,
    ) -> Result<(LeaveOutcome, Vec<RoundEvent>), TableError> {
        let seat = self
            .seat_of(name)
            .ok_or_else(|| TableError::NotSeated(name.clone()))?;
        let in_hand = self
            .player(seat)
            .is_some_and(Player::is_in_hand);
        if let Some(round) = self.round.as_mut()
            && in_hand
        {
            let events = round.disconnect(&mut self.seats, seat);
            self.pending_leaves.insert(seat);
            return Ok((LeaveOutcome::Deferred { seat }, events));
        }
        let chips = self.player(seat).map_or(0, |p| p.chips);
        self.seats[seat] = None;
        self.pending_leaves.remove(&seat);
        info!("{name} leaves seat {seat} with ${chips}");
        Ok((LeaveOutcome::Immediate { seat, chips }, Vec::new()))
    }

    /// A session dropped. Live seats forfeit the hand; all-in seats
    /// stay eligible and convert once the hand settles.
    pub fn disconnect(&mut self, name: &PlayerName) -> Vec<RoundEvent> {
        let Some(seat) = self.seat_of(name) else {
            return Vec::new();
        };
        if let Some(round) = self.round.as_mut() {
            if self.seats[seat].as_ref().is_some_and(|p| p.state == SeatState::AllIn) {
                self.pending_disconnects.insert(seat);
                return Vec::new();
            }
            return round.disconnect(&mut self.seats, seat);
        }
        if let Some(player) = self.seats[seat].as_mut() {
            player.state = SeatState::Disconnected;
        }
        Vec::new()
    }

    /// A session returned for a seated identity.
    pub fn reconnect(&mut self, name: &PlayerName) {
        if let Some(seat) = self.seat_of(name)
            && let Some(player) = self.seats[seat].as_mut()
            && player.state == SeatState::Disconnected
        {
            player.state = SeatState::Seated;
        }
    }

    /// Deal the next hand: rotate the button to the next funded seat
    /// and spin up a round.
    pub fn start_hand(&mut self) -> Result<Vec<RoundEvent>, RoundError> {
        if self.round.is_some() {
            return Err(RoundError::HandInProgress);
        }
        let n = self.seats.len();
        let button = (1..=n)
            .map(|i| (self.button + i) % n)
            .find(|&s| {
                self.seats[s]
                    .as_ref()
                    .is_some_and(|p| p.chips > 0 && p.state == SeatState::Seated)
            })
            .ok_or(RoundError::NotEnoughPlayers)?;

        self.hand_no += 1;
        let (round, events) = Round::start(&mut self.seats, self.hand_no, button, self.forced_bet)?;
        self.button = button;
        self.stacks_at_deal = self
            .seats
            .iter()
            .flatten()
            .filter(|p| p.is_in_hand())
            .map(|p| (p.seat_idx, p.chips + round.total_contribution(p.seat_idx)))
            .collect();
        self.round = Some(round);
        Ok(events)
    }

    /// Forward an action to the round engine's gateway.
    pub fn apply_action(
        &mut self,
        seat: SeatIndex,
        action: Action,
        synthetic: bool,
    ) -> Result<(AppliedAction, Vec<RoundEvent>), RejectedAction> {
        let round = self
            .round
            .as_mut()
            .ok_or(RejectedAction::NoActionPending)?;
        round.apply_action(&mut self.seats, seat, action, synthetic)
    }

    #[must_use]
    pub fn legal_actions(&self, seat: SeatIndex) -> Option<LegalActions> {
        self.round
            .as_ref()
            .map(|round| round.legal_actions(&self.seats, seat))
    }

    /// Record the wall-clock deadline for the current turn so that
    /// snapshots can show it. The room owns the actual timer.
    pub fn set_turn_deadline(&mut self, deadline: Option<chrono::DateTime<chrono::Utc>>) {
        if let Some(round) = self.round.as_mut() {
            round.deadline = deadline;
        }
    }

    /// Close the books on a settled round: compute per-seat ledger
    /// deltas, apply deferred disconnects and departures, drop the
    /// round. Returns `None` while a hand is still live.
    pub fn finish_hand(&mut self) -> Option<HandOutcome> {
        let round = self.round.as_ref()?;
        if !round.is_settled() {
            return None;
        }
        let aborted = round.settlement().is_some_and(|s| s.aborted);
        let hand_no = round.hand_no;

        let deltas: Vec<SeatDelta> = self
            .stacks_at_deal
            .iter()
            .filter_map(|(&seat, &before)| {
                let player = self.player(seat)?;
                Some(SeatDelta {
                    seat,
                    name: player.name.clone(),
                    delta: i64::from(player.chips) - i64::from(before),
                    balance_before: before,
                    balance_after: player.chips,
                })
            })
            .collect();

        for &seat in &self.pending_disconnects {
            if let Some(player) = self.seats[seat].as_mut() {
                player.state = SeatState::Disconnected;
            }
        }
        self.pending_disconnects.clear();

        for player in self.seats.iter_mut().flatten() {
            player.reset_for_hand();
        }

        let mut departed = Vec::new();
        for seat in std::mem::take(&mut self.pending_leaves) {
            if let Some(player) = self.seats[seat].take() {
                departed.push((player.name, player.chips));
            }
        }

        self.round = None;
        self.stacks_at_deal.clear();
        Some(HandOutcome {
            hand_no,
            aborted,
            deltas,
            departed,
        })
    }
}
