//! The per-hand state machine: betting streets, showdown, settlement,
//! and the action gateway that validates every requested action before
//! it can touch a stack or a pot.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use super::constants::BOARD_SIZE;
use super::entities::{
    Action, AppliedAction, Card, Chips, Deck, LegalActions, Player, SeatIndex, SeatState,
};
use super::errors::{RejectedAction, RoundError};
use super::eval::{self, HandScore};
use super::pots::{Pot, PotAccountant};

/// A table's seats: a fixed-size map from seat index to occupant.
/// Indices stay stable as players come and go.
pub type Seats = [Option<Player>];

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, PartialOrd, Ord, Serialize)]
pub enum Phase {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
    Settled,
}

impl Phase {
    /// Cards on the board once this street has been dealt.
    #[must_use]
    pub fn board_size(self) -> usize {
        match self {
            Self::Preflop => 0,
            Self::Flop => 3,
            Self::Turn => 4,
            Self::River | Self::Showdown | Self::Settled => BOARD_SIZE,
        }
    }
}

/// A hole-card reveal at showdown.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ShowdownReveal {
    pub seat: SeatIndex,
    pub cards: Vec<Card>,
    pub score: HandScore,
    pub description: String,
}

/// What happened inside the engine as a result of an action or a hand
/// start. The room fans these out to its broadcast subscribers.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum RoundEvent {
    HandStarted {
        hand_no: u64,
        button: SeatIndex,
    },
    ForcedBetPosted {
        seat: SeatIndex,
        amount: Chips,
    },
    StreetDealt {
        phase: Phase,
        board: Vec<Card>,
    },
    Showdown {
        reveals: Vec<ShowdownReveal>,
    },
    PotAwarded {
        seat: SeatIndex,
        amount: Chips,
    },
    HandSettled {
        payouts: BTreeMap<SeatIndex, Chips>,
    },
    HandAborted {
        reason: String,
        refunds: BTreeMap<SeatIndex, Chips>,
    },
}

/// The outcome of a settled hand, kept for ledger emission.
#[derive(Clone, Debug)]
pub struct Settlement {
    pub payouts: BTreeMap<SeatIndex, Chips>,
    pub pot_total: Chips,
    pub aborted: bool,
}

/// One hand of Hold'em. Created by the table when a hand starts and
/// dropped once settled; the table and its players persist across
/// rounds.
#[derive(Debug)]
pub struct Round {
    pub hand_no: u64,
    phase: Phase,
    deck: Deck,
    community: Vec<Card>,
    pot: PotAccountant,
    /// Seats dealt into this hand. Fixed at start; chip conservation is
    /// checked over exactly this set.
    participants: BTreeSet<SeatIndex>,
    button: SeatIndex,
    forced_bet: Chips,
    bet_to_call: Chips,
    /// Size of the last raise this street; the minimum a further raise
    /// must add.
    last_raise: Chips,
    street_contrib: BTreeMap<SeatIndex, Chips>,
    /// Seats still owing an action this street.
    to_act: BTreeSet<SeatIndex>,
    turn: Option<SeatIndex>,
    /// Bumped on every turn change. The scheduler and AI queries tag
    /// their results with the serial they saw; stale results are
    /// discarded instead of double-applying.
    turn_serial: u64,
    /// Wall-clock deadline for the current turn, set by the room when
    /// it arms the scheduler. Included in snapshots.
    pub deadline: Option<DateTime<Utc>>,
    initial_total: Chips,
    settlement: Option<Settlement>,
}

impl Round {
    /// Deal a new hand. Requires at least two funded seats, one of
    /// them a connected human. The button seat posts the forced bet.
    pub fn start(
        seats: &mut Seats,
        hand_no: u64,
        button: SeatIndex,
        forced_bet: Chips,
    ) -> Result<(Self, Vec<RoundEvent>), RoundError> {
        for player in seats.iter_mut().flatten() {
            player.reset_for_hand();
        }
        let participants: BTreeSet<SeatIndex> = seats
            .iter()
            .flatten()
            .filter(|p| p.state == SeatState::Seated && p.chips > 0)
            .map(|p| p.seat_idx)
            .collect();
        if participants.len() < 2 {
            return Err(RoundError::NotEnoughPlayers);
        }
        if !seats
            .iter()
            .flatten()
            .any(|p| participants.contains(&p.seat_idx) && p.is_present_human())
        {
            return Err(RoundError::NoHumanPresent);
        }

        let initial_total = seats
            .iter()
            .flatten()
            .filter(|p| participants.contains(&p.seat_idx))
            .map(|p| p.chips)
            .sum();
        let mut round = Self {
            hand_no,
            phase: Phase::Preflop,
            deck: Deck::shuffled(),
            community: Vec::with_capacity(BOARD_SIZE),
            pot: PotAccountant::new(),
            participants,
            button,
            forced_bet,
            bet_to_call: 0,
            last_raise: forced_bet,
            street_contrib: BTreeMap::new(),
            to_act: BTreeSet::new(),
            turn: None,
            turn_serial: 0,
            deadline: None,
            initial_total,
            settlement: None,
        };

        let order = round.clockwise_from(button, seats.len());
        for &seat in &order {
            if let Some(player) = seats[seat].as_mut() {
                player.state = SeatState::Active;
            }
        }
        // Two passes, one card each, starting left of the button.
        for _ in 0..2 {
            for &seat in &order {
                let card = round.deck.deal();
                if let Some(player) = seats[seat].as_mut() {
                    player.cards.push(card);
                }
            }
        }

        let mut events = vec![RoundEvent::HandStarted { hand_no, button }];

        // The forced bet emulates a blind: the poster opens the street,
        // so action closes back on them if nobody raises.
        let posted = seats[button]
            .as_ref()
            .map_or(0, |p| forced_bet.min(p.chips));
        round.commit(seats, button, posted);
        round.bet_to_call = posted;
        events.push(RoundEvent::ForcedBetPosted {
            seat: button,
            amount: posted,
        });

        round.to_act = order
            .iter()
            .copied()
            .filter(|&s| s != button && seats[s].as_ref().is_some_and(Player::can_act))
            .collect();
        round.turn = round.next_to_act(button, seats);
        round.turn_serial = 1;

        debug!(
            "hand {hand_no}: dealt {} players, button seat {button} posted ${posted}",
            round.participants.len()
        );
        Ok((round, events))
    }

    /// Participant seats clockwise starting left of `from`.
    fn clockwise_from(&self, from: SeatIndex, num_seats: usize) -> Vec<SeatIndex> {
        (1..=num_seats)
            .map(|i| (from + i) % num_seats)
            .filter(|s| self.participants.contains(s))
            .collect()
    }

    fn next_to_act(&self, after: SeatIndex, seats: &Seats) -> Option<SeatIndex> {
        let n = seats.len();
        (1..=n)
            .map(|i| (after + i) % n)
            .find(|s| self.to_act.contains(s) && seats[*s].as_ref().is_some_and(Player::can_act))
    }

    /// Move chips from a stack into the pot.
    fn commit(&mut self, seats: &mut Seats, seat: SeatIndex, amount: Chips) {
        let Some(player) = seats[seat].as_mut() else {
            return;
        };
        debug_assert!(amount <= player.chips);
        player.chips -= amount;
        if player.chips == 0 {
            player.state = SeatState::AllIn;
        }
        *self.street_contrib.entry(seat).or_default() += amount;
        self.pot.record_contribution(seat, amount);
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn community(&self) -> &[Card] {
        &self.community
    }

    #[must_use]
    pub fn turn(&self) -> Option<SeatIndex> {
        self.turn
    }

    #[must_use]
    pub fn turn_serial(&self) -> u64 {
        self.turn_serial
    }

    #[must_use]
    pub fn button(&self) -> SeatIndex {
        self.button
    }

    #[must_use]
    pub fn pot_total(&self) -> Chips {
        self.pot.total()
    }

    #[must_use]
    pub fn pots(&self) -> Vec<Pot> {
        self.pot.pots()
    }

    #[must_use]
    pub fn bet_to_call(&self) -> Chips {
        self.bet_to_call
    }

    #[must_use]
    pub fn street_contribution(&self, seat: SeatIndex) -> Chips {
        self.street_contrib.get(&seat).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_contribution(&self, seat: SeatIndex) -> Chips {
        self.pot.contribution(seat)
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Settled
    }

    #[must_use]
    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref()
    }

    /// The legal action set for a seat, with bet bounds.
    #[must_use]
    pub fn legal_actions(&self, seats: &Seats, seat: SeatIndex) -> LegalActions {
        let chips = seats
            .get(seat)
            .and_then(Option::as_ref)
            .map_or(0, |p| p.chips);
        let contributed = self.street_contribution(seat);
        let owed = self.bet_to_call.saturating_sub(contributed);
        LegalActions {
            call_amount: owed.min(chips),
            min_raise_to: if self.bet_to_call == 0 {
                self.forced_bet
            } else {
                self.bet_to_call + self.last_raise
            },
            max_bet_to: contributed + chips,
        }
    }

    /// The action the scheduler synthesizes when a turn deadline
    /// expires: fold when the holder still owes chips, check when the
    /// bet is already matched. Not an error, a normal transition.
    #[must_use]
    pub fn timeout_action(&self, seat: SeatIndex) -> Action {
        if self.bet_to_call > self.street_contribution(seat) {
            Action::Fold
        } else {
            Action::Check
        }
    }

    /// The action gateway. Validates `action` against the current
    /// street and the actor's seat state, then applies it atomically:
    /// stack, contributions, turn pointer, and phase transitions all
    /// move before the call returns.
    pub fn apply_action(
        &mut self,
        seats: &mut Seats,
        seat: SeatIndex,
        action: Action,
        synthetic: bool,
    ) -> Result<(AppliedAction, Vec<RoundEvent>), RejectedAction> {
        let Some(turn) = self.turn else {
            return Err(RejectedAction::NoActionPending);
        };
        let player = seats
            .get(seat)
            .and_then(Option::as_ref)
            .ok_or(RejectedAction::UnknownSeat(seat))?;
        if !player.can_act() {
            return Err(RejectedAction::NotActionable {
                state: player.state,
            });
        }
        if seat != turn {
            return Err(RejectedAction::NotYourTurn);
        }

        let contributed = self.street_contribution(seat);
        let owed = self.bet_to_call.saturating_sub(contributed);
        let stack = player.chips;
        match action {
            Action::Fold => {
                if let Some(p) = seats[seat].as_mut() {
                    p.state = SeatState::Folded;
                }
                self.pot.mark_folded(seat);
            }
            Action::Check => {
                if owed > 0 {
                    return Err(RejectedAction::CheckWithBetPending { owed });
                }
            }
            Action::Call => {
                if owed == 0 {
                    return Err(RejectedAction::NothingToCall);
                }
                self.commit(seats, seat, owed.min(stack));
            }
            Action::Bet(amount) => {
                let max_bet_to = contributed + stack;
                let min_raise_to = if self.bet_to_call == 0 {
                    self.forced_bet
                } else {
                    self.bet_to_call + self.last_raise
                };
                if amount > max_bet_to {
                    return Err(RejectedAction::BetExceedsStack { amount, stack });
                }
                if amount <= self.bet_to_call || (amount < min_raise_to && amount != max_bet_to) {
                    return Err(RejectedAction::BetBelowMinimum { min: min_raise_to });
                }
                self.commit(seats, seat, amount - contributed);
                self.last_raise = amount - self.bet_to_call;
                self.bet_to_call = amount;
                // A raise re-opens action for every other live seat.
                self.to_act = self
                    .participants
                    .iter()
                    .copied()
                    .filter(|&s| {
                        s != seat && seats[s].as_ref().is_some_and(Player::can_act)
                    })
                    .collect();
            }
        }
        self.to_act.remove(&seat);

        let applied = AppliedAction {
            seat,
            action,
            synthetic,
            at: Utc::now(),
        };
        debug!("hand {}: seat {seat} {action}", self.hand_no);
        let events = self.advance(seats, seat);
        Ok((applied, events))
    }

    /// A session behind a seat dropped. Applied only between actions
    /// (the room's mailbox guarantees this). A live seat forfeits its
    /// hand; if it held the turn, play moves on immediately.
    pub fn disconnect(&mut self, seats: &mut Seats, seat: SeatIndex) -> Vec<RoundEvent> {
        let Some(player) = seats.get_mut(seat).and_then(Option::as_mut) else {
            return Vec::new();
        };
        match player.state {
            SeatState::Active => {
                player.state = SeatState::Disconnected;
                self.pot.mark_folded(seat);
                self.to_act.remove(&seat);
                if self.turn == Some(seat) {
                    return self.advance(seats, seat);
                }
                // Not their turn: the hand only needs a push if the
                // forfeit left a single live seat.
                if seats.iter().flatten().filter(|p| p.is_in_hand()).count() <= 1 {
                    return self.advance(seats, seat);
                }
                Vec::new()
            }
            // An all-in seat has no further decisions; it stays in the
            // hand and the room flips it to disconnected afterwards.
            SeatState::AllIn => Vec::new(),
            _ => {
                player.state = SeatState::Disconnected;
                Vec::new()
            }
        }
    }

    /// Drive the state machine after an action: hand the turn to the
    /// next eligible seat, or close the street and deal, or settle.
    fn advance(&mut self, seats: &mut Seats, after: SeatIndex) -> Vec<RoundEvent> {
        let mut events = Vec::new();

        let live: Vec<SeatIndex> = seats
            .iter()
            .flatten()
            .filter(|p| p.is_in_hand())
            .map(|p| p.seat_idx)
            .collect();
        if live.len() <= 1 {
            // Everyone else folded: settle without revealing anything.
            self.turn = None;
            self.turn_serial += 1;
            self.deadline = None;
            events.extend(self.settle_uncontested(seats, live.first().copied()));
            return events;
        }

        if let Some(next) = self.next_to_act(after, seats) {
            self.turn = Some(next);
            self.turn_serial += 1;
            return events;
        }

        // Street complete.
        self.turn = None;
        self.turn_serial += 1;
        self.deadline = None;
        let can_still_act = seats.iter().flatten().filter(|p| p.can_act()).count();

        if self.phase == Phase::River || can_still_act <= 1 {
            // Deal any outstanding streets in one step (all-in runout),
            // then go to showdown.
            while self.phase < Phase::River {
                self.deal_street(&mut events);
            }
            events.extend(self.settle_showdown(seats));
            return events;
        }

        self.deal_street(&mut events);
        self.bet_to_call = 0;
        self.last_raise = self.forced_bet;
        self.street_contrib.clear();
        self.to_act = self
            .participants
            .iter()
            .copied()
            .filter(|&s| seats[s].as_ref().is_some_and(Player::can_act))
            .collect();
        self.turn = self.next_to_act(self.button, seats);
        self.turn_serial += 1;
        events
    }

    /// Deal the next street onto the board, burning first.
    fn deal_street(&mut self, events: &mut Vec<RoundEvent>) {
        self.phase = match self.phase {
            Phase::Preflop => Phase::Flop,
            Phase::Flop => Phase::Turn,
            _ => Phase::River,
        };
        self.deck.burn();
        let count = self.phase.board_size() - self.community.len();
        for _ in 0..count {
            let card = self.deck.deal();
            self.community.push(card);
        }
        events.push(RoundEvent::StreetDealt {
            phase: self.phase,
            board: self.community.clone(),
        });
    }

    /// Everyone but one seat folded: the pot is theirs, unseen cards
    /// stay unseen.
    fn settle_uncontested(
        &mut self,
        seats: &mut Seats,
        winner: Option<SeatIndex>,
    ) -> Vec<RoundEvent> {
        let Some(winner) = winner else {
            return self.abort(seats, "no live seat left to award the pot to");
        };
        if let Err(e) = self.check_conservation(seats) {
            return self.abort(seats, &e.to_string());
        }
        let amount = self.pot.total();
        if let Some(player) = seats[winner].as_mut() {
            player.chips += amount;
        }
        let payouts = BTreeMap::from([(winner, amount)]);
        self.phase = Phase::Settled;
        self.pot.clear();
        self.settlement = Some(Settlement {
            payouts: payouts.clone(),
            pot_total: amount,
            aborted: false,
        });
        vec![
            RoundEvent::PotAwarded {
                seat: winner,
                amount,
            },
            RoundEvent::HandSettled { payouts },
        ]
    }

    /// Compare the live hands and pay every pot to its best eligible
    /// owner(s).
    fn settle_showdown(&mut self, seats: &mut Seats) -> Vec<RoundEvent> {
        self.phase = Phase::Showdown;

        let mut reveals = Vec::new();
        let mut scores: BTreeMap<SeatIndex, HandScore> = BTreeMap::new();
        for player in seats.iter().flatten().filter(|p| p.is_in_hand()) {
            let mut cards = player.cards.clone();
            cards.extend(self.community.iter().copied());
            let score = eval::best_hand(&cards);
            reveals.push(ShowdownReveal {
                seat: player.seat_idx,
                cards: player.cards.clone(),
                description: score.describe(),
                score: score.clone(),
            });
            scores.insert(player.seat_idx, score);
        }
        let mut events = vec![RoundEvent::Showdown { reveals }];

        if let Err(e) = self.check_conservation(seats) {
            events.extend(self.abort(seats, &e.to_string()));
            return events;
        }
        let payouts = match self.pot.settle(&scores, self.button, seats.len()) {
            Ok(payouts) => payouts,
            Err(e) => {
                events.extend(self.abort(seats, &e.to_string()));
                return events;
            }
        };
        for (&seat, &amount) in &payouts {
            if let Some(player) = seats[seat].as_mut() {
                player.chips += amount;
            }
            events.push(RoundEvent::PotAwarded { seat, amount });
        }
        let pot_total = self.pot.total();
        self.phase = Phase::Settled;
        self.pot.clear();
        self.settlement = Some(Settlement {
            payouts: payouts.clone(),
            pot_total,
            aborted: false,
        });
        events.push(RoundEvent::HandSettled { payouts });
        events
    }

    /// Pre-payout chip conservation check: stacks plus the pot must
    /// equal what the participants brought in.
    fn check_conservation(&self, seats: &Seats) -> Result<(), RoundError> {
        let stacks: Chips = seats
            .iter()
            .flatten()
            .filter(|p| self.participants.contains(&p.seat_idx))
            .map(|p| p.chips)
            .sum();
        let expected = self.initial_total;
        let actual = stacks + self.pot.total();
        if actual != expected {
            return Err(RoundError::InvariantViolation {
                details: format!("stacks + pot = ${actual}, expected ${expected}"),
            });
        }
        Ok(())
    }

    /// Fatal to this round: log it, hand every contribution back, and
    /// settle as aborted rather than guess at payouts.
    fn abort(&mut self, seats: &mut Seats, reason: &str) -> Vec<RoundEvent> {
        error!("hand {} aborted: {reason}", self.hand_no);
        let refunds = self.pot.refunds();
        for (&seat, &amount) in &refunds {
            if let Some(player) = seats.get_mut(seat).and_then(Option::as_mut) {
                player.chips += amount;
            }
        }
        self.turn = None;
        self.turn_serial += 1;
        self.deadline = None;
        self.phase = Phase::Settled;
        self.pot.clear();
        self.settlement = Some(Settlement {
            payouts: BTreeMap::new(),
            pot_total: 0,
            aborted: true,
        });
        vec![RoundEvent::HandAborted {
            reason: reason.to_string(),
            refunds,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::{PlayerName, SeatBacking};

    fn seats(stacks: &[Chips]) -> Vec<Option<Player>> {
        stacks
            .iter()
            .enumerate()
            .map(|(i, &chips)| {
                Some(Player::new(
                    PlayerName::new(&format!("p{i}")),
                    i,
                    chips,
                    if i == 0 {
                        SeatBacking::Human
                    } else {
                        SeatBacking::Ai
                    },
                ))
            })
            .collect()
    }

    fn player(seats: &[Option<Player>], seat: SeatIndex) -> &Player {
        seats[seat].as_ref().expect("occupied seat")
    }

    fn total_chips(seats: &[Option<Player>], round: &Round) -> Chips {
        seats.iter().flatten().map(|p| p.chips).sum::<Chips>() + round.pot_total()
    }

    /// Check or call every turn until the hand settles.
    fn passive_runout(round: &mut Round, seats: &mut Vec<Option<Player>>) {
        let mut guard = 0;
        while !round.is_settled() {
            guard += 1;
            assert!(guard < 100, "hand did not terminate");
            let turn = round.turn().expect("unsettled hand must have a turn");
            let action = if round.legal_actions(seats, turn).can_check() {
                Action::Check
            } else {
                Action::Call
            };
            round.apply_action(seats, turn, action, false).unwrap();
        }
    }

    #[test]
    fn start_posts_forced_bet_and_hands_turn_left_of_button() {
        let mut s = seats(&[200, 200, 200]);
        let (round, events) = Round::start(&mut s, 1, 0, 10).unwrap();
        assert_eq!(round.phase(), Phase::Preflop);
        assert_eq!(round.bet_to_call(), 10);
        assert_eq!(player(&s, 0).chips, 190);
        assert_eq!(round.turn(), Some(1));
        assert!(s.iter().flatten().all(|p| p.cards.len() == 2));
        assert!(matches!(
            events[1],
            RoundEvent::ForcedBetPosted { seat: 0, amount: 10 }
        ));
    }

    #[test]
    fn start_requires_two_funded_seats_and_a_human() {
        let mut solo = seats(&[200]);
        assert_eq!(
            Round::start(&mut solo, 1, 0, 10).unwrap_err(),
            RoundError::NotEnoughPlayers
        );

        let mut s = seats(&[200, 200]);
        for p in s.iter_mut().flatten() {
            p.backing = SeatBacking::Ai;
        }
        assert_eq!(
            Round::start(&mut s, 1, 0, 10).unwrap_err(),
            RoundError::NoHumanPresent
        );
    }

    #[test]
    fn broke_and_empty_seats_are_not_dealt_in() {
        let mut s = seats(&[200, 0, 200]);
        s.push(None);
        let (round, _) = Round::start(&mut s, 1, 0, 10).unwrap();
        assert_eq!(player(&s, 1).state, SeatState::Seated);
        assert!(player(&s, 1).cards.is_empty());
        assert!(!round.participants.contains(&1));
        assert!(!round.participants.contains(&3));
    }

    #[test]
    fn gateway_rejects_out_of_turn_and_bad_checks() {
        let mut s = seats(&[200, 200, 200]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();
        assert_eq!(round.turn(), Some(1));

        assert_eq!(
            round.apply_action(&mut s, 2, Action::Call, false).unwrap_err(),
            RejectedAction::NotYourTurn
        );
        assert_eq!(
            round.apply_action(&mut s, 1, Action::Check, false).unwrap_err(),
            RejectedAction::CheckWithBetPending { owed: 10 }
        );
        assert_eq!(
            round
                .apply_action(&mut s, 1, Action::Bet(15), false)
                .unwrap_err(),
            RejectedAction::BetBelowMinimum { min: 20 }
        );
        assert_eq!(
            round
                .apply_action(&mut s, 1, Action::Bet(500), false)
                .unwrap_err(),
            RejectedAction::BetExceedsStack {
                amount: 500,
                stack: 200
            }
        );
    }

    #[test]
    fn folded_seat_is_rejected_not_queued() {
        let mut s = seats(&[200, 200, 200]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();
        round.apply_action(&mut s, 1, Action::Fold, false).unwrap();
        assert_eq!(
            round.apply_action(&mut s, 1, Action::Call, false).unwrap_err(),
            RejectedAction::NotActionable {
                state: SeatState::Folded
            }
        );
    }

    #[test]
    fn calls_close_the_street_back_on_the_poster() {
        let mut s = seats(&[200, 200, 200]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();

        round.apply_action(&mut s, 1, Action::Call, false).unwrap();
        assert_eq!(round.turn(), Some(2));
        let (_, events) = round.apply_action(&mut s, 2, Action::Call, false).unwrap();

        // Everyone matched the forced bet; the flop comes out and the
        // poster does not act again preflop.
        assert_eq!(round.phase(), Phase::Flop);
        assert_eq!(round.community().len(), 3);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, RoundEvent::StreetDealt { phase: Phase::Flop, .. }))
        );
        // Postflop action starts left of the button.
        assert_eq!(round.turn(), Some(1));
        assert_eq!(round.bet_to_call(), 0);
    }

    #[test]
    fn raise_reopens_action() {
        let mut s = seats(&[200, 200, 200]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();

        round.apply_action(&mut s, 1, Action::Bet(30), false).unwrap();
        assert_eq!(round.bet_to_call(), 30);
        // Seat 2 and the button both owe action again.
        round.apply_action(&mut s, 2, Action::Call, false).unwrap();
        assert_eq!(round.turn(), Some(0));
        round.apply_action(&mut s, 0, Action::Call, false).unwrap();
        assert_eq!(round.phase(), Phase::Flop);
        assert_eq!(round.pot_total(), 90);
    }

    #[test]
    fn min_raise_tracks_previous_raise_size() {
        let mut s = seats(&[500, 500, 500]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();

        // Raise to 50 over the forced 10: last raise is 40, so the
        // next raise must reach 90.
        round.apply_action(&mut s, 1, Action::Bet(50), false).unwrap();
        assert_eq!(
            round
                .apply_action(&mut s, 2, Action::Bet(60), false)
                .unwrap_err(),
            RejectedAction::BetBelowMinimum { min: 90 }
        );
        round.apply_action(&mut s, 2, Action::Bet(90), false).unwrap();
        assert_eq!(round.bet_to_call(), 90);
    }

    #[test]
    fn all_in_below_min_raise_is_legal() {
        let mut s = seats(&[500, 500, 65]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();

        round.apply_action(&mut s, 1, Action::Bet(50), false).unwrap();
        // Seat 2 shoves 65 total, under the 90 minimum: allowed as an
        // exact all-in.
        round.apply_action(&mut s, 2, Action::Bet(65), false).unwrap();
        assert_eq!(player(&s, 2).state, SeatState::AllIn);
        assert_eq!(round.bet_to_call(), 65);
    }

    #[test]
    fn fold_to_one_short_circuits_without_reveals() {
        let mut s = seats(&[200, 200, 200]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();
        let before = total_chips(&s, &round);

        round.apply_action(&mut s, 1, Action::Fold, false).unwrap();
        let (_, events) = round.apply_action(&mut s, 2, Action::Fold, false).unwrap();

        assert!(round.is_settled());
        assert_eq!(round.community().len(), 0);
        assert!(
            events
                .iter()
                .any(|e| matches!(e, RoundEvent::PotAwarded { seat: 0, amount: 10 }))
        );
        assert!(!events.iter().any(|e| matches!(e, RoundEvent::Showdown { .. })));
        assert_eq!(player(&s, 0).chips, 200);
        assert_eq!(total_chips(&s, &round), before);
    }

    #[test]
    fn all_in_runout_deals_remaining_streets_in_one_step() {
        let mut s = seats(&[100, 100]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();
        let before = total_chips(&s, &round);

        round.apply_action(&mut s, 1, Action::Bet(100), false).unwrap();
        let (_, events) = round.apply_action(&mut s, 0, Action::Call, false).unwrap();

        assert!(round.is_settled());
        assert_eq!(round.community().len(), 5);
        assert!(events.iter().any(|e| matches!(e, RoundEvent::Showdown { .. })));
        assert_eq!(total_chips(&s, &round), before);
        let settlement = round.settlement().unwrap();
        assert_eq!(settlement.pot_total, 200);
        assert!(!settlement.aborted);
    }

    #[test]
    fn full_hand_conserves_chips_and_turn_stays_single() {
        let mut s = seats(&[200, 200, 200, 200]);
        let (mut round, _) = Round::start(&mut s, 7, 2, 10).unwrap();
        let before = total_chips(&s, &round);

        passive_runout(&mut round, &mut s);
        assert_eq!(round.turn(), None);
        assert_eq!(
            s.iter().flatten().map(|p| p.chips).sum::<Chips>(),
            before,
            "settlement must redistribute the pot exactly"
        );
    }

    #[test]
    fn deck_cards_stay_disjoint_across_a_hand() {
        let mut s = seats(&[200, 200, 200, 200]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();
        passive_runout(&mut round, &mut s);

        let mut seen = std::collections::HashSet::new();
        for p in s.iter().flatten() {
            for card in &p.cards {
                assert!(seen.insert(*card), "duplicate card {card}");
            }
        }
        for card in round.community() {
            assert!(seen.insert(*card), "duplicate card {card}");
        }
        assert!(seen.len() <= 52);
    }

    #[test]
    fn timeout_action_folds_when_owing_checks_when_matched() {
        let mut s = seats(&[200, 200, 200]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();

        // Seat 1 owes the forced bet: a timeout folds.
        assert_eq!(round.timeout_action(1), Action::Fold);
        round.apply_action(&mut s, 1, Action::Call, false).unwrap();
        round.apply_action(&mut s, 2, Action::Call, false).unwrap();

        // Fresh street, nothing owed: a timeout checks.
        assert_eq!(round.phase(), Phase::Flop);
        let turn = round.turn().unwrap();
        assert_eq!(round.timeout_action(turn), Action::Check);
    }

    #[test]
    fn synthetic_timeout_flows_through_the_gateway() {
        let mut s = seats(&[200, 200, 200]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();

        let turn = round.turn().unwrap();
        let action = round.timeout_action(turn);
        let (applied, _) = round.apply_action(&mut s, turn, action, true).unwrap();
        assert!(applied.synthetic);
        assert_eq!(player(&s, turn).state, SeatState::Folded);
        assert_ne!(round.turn(), Some(turn));
    }

    #[test]
    fn folded_seat_never_regains_the_turn() {
        let mut s = seats(&[200, 200, 200]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();

        round.apply_action(&mut s, 1, Action::Fold, false).unwrap();
        while !round.is_settled() {
            let turn = round.turn().unwrap();
            assert_ne!(turn, 1, "folded seat received the turn");
            let action = if round.legal_actions(&s, turn).can_check() {
                Action::Check
            } else {
                Action::Call
            };
            round.apply_action(&mut s, turn, action, false).unwrap();
        }
    }

    #[test]
    fn disconnect_on_turn_moves_play_along() {
        let mut s = seats(&[200, 200, 200]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();

        assert_eq!(round.turn(), Some(1));
        round.disconnect(&mut s, 1);
        assert_eq!(player(&s, 1).state, SeatState::Disconnected);
        assert_eq!(round.turn(), Some(2));
    }

    #[test]
    fn disconnect_of_second_to_last_live_seat_settles() {
        let mut s = seats(&[200, 200]);
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();
        let before = total_chips(&s, &round);

        // Seat 0 posted and waits; seat 1 holds the turn and drops.
        let events = round.disconnect(&mut s, 1);
        assert!(round.is_settled());
        assert!(
            events
                .iter()
                .any(|e| matches!(e, RoundEvent::PotAwarded { seat: 0, .. }))
        );
        assert_eq!(total_chips(&s, &round), before);
    }

    #[test]
    fn short_stack_forced_bet_posts_what_it_can() {
        let mut s = seats(&[6, 200, 200]);
        let (round, _) = Round::start(&mut s, 1, 0, 10).unwrap();
        assert_eq!(player(&s, 0).state, SeatState::AllIn);
        assert_eq!(round.bet_to_call(), 6);
        assert_eq!(round.pot_total(), 6);
    }
}
