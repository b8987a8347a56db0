//! Property-based conservation tests: whatever sequence of actions a
//! hand sees, chips are never created or destroyed, the turn pointer
//! stays single, and the scheduler's synthetic actions always apply.

use holdem_rooms::game::entities::{Action, Chips, Player, PlayerName, SeatBacking};
use holdem_rooms::game::round::Round;
use proptest::prelude::*;

fn seats(stacks: &[Chips]) -> Vec<Option<Player>> {
    stacks
        .iter()
        .enumerate()
        .map(|(i, &chips)| {
            let backing = if i == 0 {
                SeatBacking::Human
            } else {
                SeatBacking::Ai
            };
            Some(Player::new(
                PlayerName::new(&format!("p{i}")),
                i,
                chips,
                backing,
            ))
        })
        .collect()
}

fn table_total(seats: &[Option<Player>], round: &Round) -> Chips {
    seats.iter().flatten().map(|p| p.chips).sum::<Chips>() + round.pot_total()
}

fn to_action(kind: usize, amount: Chips) -> Action {
    match kind {
        0 => Action::Fold,
        1 => Action::Check,
        2 => Action::Call,
        _ => Action::Bet(amount),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Arbitrary (often illegal) action scripts: rejected actions
    /// change nothing, applied actions move chips only between stacks
    /// and the pot, and exactly one actionable seat holds the turn at
    /// any point of an unsettled hand.
    #[test]
    fn random_play_conserves_chips(
        stacks in prop::collection::vec(20u32..500, 3..6),
        script in prop::collection::vec((0usize..4, 1u32..600u32), 0..60),
    ) {
        let mut s = seats(&stacks);
        let initial: Chips = stacks.iter().sum();
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();

        for (kind, amount) in script {
            if round.is_settled() {
                break;
            }
            let Some(turn) = round.turn() else { break };
            let holder = s[turn].as_ref().expect("turn points at a seat");
            prop_assert!(holder.can_act(), "turn holder must be actionable");

            let _ = round.apply_action(&mut s, turn, to_action(kind, amount), false);
            prop_assert_eq!(table_total(&s, &round), initial);
        }

        // Finish passively; the gateway must accept check-or-call from
        // every remaining turn holder.
        let mut guard = 0;
        while !round.is_settled() {
            guard += 1;
            prop_assert!(guard < 200, "hand did not terminate");
            let turn = round.turn().expect("unsettled hand has a turn");
            let action = if round.legal_actions(&s, turn).can_check() {
                Action::Check
            } else {
                Action::Call
            };
            round.apply_action(&mut s, turn, action, false).unwrap();
            prop_assert_eq!(table_total(&s, &round), initial);
        }

        prop_assert_eq!(round.turn(), None);
        let settled: Chips = s.iter().flatten().map(|p| p.chips).sum();
        prop_assert_eq!(settled, initial);
    }

    /// The scheduler path: if every deadline expires with no real
    /// action, the synthesized fold-or-check is always accepted by the
    /// gateway and the hand still terminates with conserved chips.
    #[test]
    fn timeout_only_hands_terminate_cleanly(
        stacks in prop::collection::vec(20u32..500, 2..6),
    ) {
        let mut s = seats(&stacks);
        let initial: Chips = stacks.iter().sum();
        let (mut round, _) = Round::start(&mut s, 1, 0, 10).unwrap();

        let mut guard = 0;
        while !round.is_settled() {
            guard += 1;
            prop_assert!(guard < 100, "hand did not terminate");
            let turn = round.turn().expect("unsettled hand has a turn");
            let action = round.timeout_action(turn);
            round.apply_action(&mut s, turn, action, true).unwrap();
            prop_assert_eq!(table_total(&s, &round), initial);
        }

        let settled: Chips = s.iter().flatten().map(|p| p.chips).sum();
        prop_assert_eq!(settled, initial);
    }
}
