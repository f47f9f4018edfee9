//! The matching algorithm (spec §4.3), factored out as a pure function over
//! `available` so it can be unit-tested without a running pool.
//!
//! The spec describes the Matcher as "a separate goroutine driven by a
//! coalesced `matchTrigger` signal". This crate instead runs the algorithm
//! inline on `BotPool::run`'s own task (see `pool::bot_pool`): the spec also
//! says `bots`/`available` are owned exclusively by that task, and a truly
//! separate matcher task would have to take a lock or channel round-trip to
//! touch them anyway. Folding the algorithm into the same task preserves
//! every invariant (steps below are unchanged) while removing a redundant
//! hop; the `matchTrigger` coalescing is preserved via a `tokio::sync::Notify`
//! the run task awaits in the same `select!` as register/unregister events.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::RngCore;

use crate::bot::Bot;
use crate::config::Config;

pub enum MatchOutcome {
    HandLimitReached,
    NoHand,
    Hand { seats: Vec<Arc<Bot>>, seed: u64 },
}

pub struct MatchStep {
    pub outcome: MatchOutcome,
    /// Bots discarded this round for having no chips; the caller must fully
    /// unregister these (spec §4.3 step 2).
    pub discard_no_chips: Vec<Arc<Bot>>,
    /// Whether a re-trigger should be queued immediately (spec §4.3 step 6).
    pub retrigger: bool,
}

/// Run one wake of the matcher (spec §4.3 steps 1–7, minus step 7's actual
/// `HandRunner` spawn — that is the caller's responsibility since it needs
/// the pool's hand counter and config snapshot plumbing).
pub fn attempt_match(
    available: &mut VecDeque<Arc<Bot>>,
    config: &Config,
    hand_counter: u64,
    rng: &mut impl RngCore,
) -> MatchStep {
    if config.hand_limit > 0 && hand_counter >= config.hand_limit {
        return MatchStep {
            outcome: MatchOutcome::HandLimitReached,
            discard_no_chips: Vec::new(),
            retrigger: false,
        };
    }

    // Step 2: drain and filter.
    let mut candidates: Vec<Arc<Bot>> = available.drain(..).collect();
    let mut discard_no_chips = Vec::new();
    candidates.retain(|b| {
        if b.is_closed() || b.in_hand() {
            false
        } else if !b.has_chips(config.infinite_bankroll) {
            discard_no_chips.push(Arc::clone(b));
            false
        } else {
            true
        }
    });

    // Step 3: not enough candidates — restore them and wait for another trigger.
    if candidates.len() < config.min_players {
        available.extend(candidates);
        return MatchStep {
            outcome: MatchOutcome::NoHand,
            discard_no_chips,
            retrigger: false,
        };
    }

    // Step 4: shuffle under the (already-exclusive, by construction) pool RNG.
    candidates.shuffle(rng);

    // Step 5: select seats for the hand.
    let seat_count = candidates.len().min(config.max_players);
    let selected: Vec<Arc<Bot>> = candidates.drain(..seat_count).collect();
    let unselected = candidates;

    if config.require_player
        && !selected
            .iter()
            .any(|b| b.role() == botpoker_shared::Role::Player)
    {
        // Nobody real in the selection: put everyone back and wait.
        available.extend(selected);
        available.extend(unselected);
        return MatchStep {
            outcome: MatchOutcome::NoHand,
            discard_no_chips,
            retrigger: false,
        };
    }

    // Step 6: requeue the tail; re-trigger if there's already enough for another hand.
    let retrigger = unselected.len() >= config.min_players;
    available.extend(unselected);

    let seed = rng.next_u64();
    MatchStep {
        outcome: MatchOutcome::Hand { seats: selected, seed },
        discard_no_chips,
        retrigger,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use botpoker_shared::Role;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn make_bot(id: &str, chips: u32, role: Role) -> Arc<Bot> {
        let (bot, _rx) = crate::bot::Bot::test_new(id, chips, role);
        bot
    }

    #[test]
    fn waits_when_below_min_players() {
        let mut available = VecDeque::new();
        available.push_back(make_bot("a", 1000, Role::Player));
        let cfg = Config {
            min_players: 2,
            ..Config::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let step = attempt_match(&mut available, &cfg, 0, &mut rng);
        assert!(matches!(step.outcome, MatchOutcome::NoHand));
        assert_eq!(available.len(), 1);
    }

    #[test]
    fn forms_a_hand_with_enough_players() {
        let mut available = VecDeque::new();
        for i in 0..4 {
            available.push_back(make_bot(&format!("p{i}"), 1000, Role::Player));
        }
        let cfg = Config {
            min_players: 2,
            max_players: 6,
            ..Config::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let step = attempt_match(&mut available, &cfg, 0, &mut rng);
        match step.outcome {
            MatchOutcome::Hand { seats, .. } => assert_eq!(seats.len(), 4),
            _ => panic!("expected a hand"),
        }
        assert!(available.is_empty());
    }

    #[test]
    fn respects_max_players_and_requeues_tail() {
        let mut available = VecDeque::new();
        for i in 0..8 {
            available.push_back(make_bot(&format!("p{i}"), 1000, Role::Player));
        }
        let cfg = Config {
            min_players: 2,
            max_players: 6,
            ..Config::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let step = attempt_match(&mut available, &cfg, 0, &mut rng);
        match step.outcome {
            MatchOutcome::Hand { seats, .. } => assert_eq!(seats.len(), 6),
            _ => panic!("expected a hand"),
        }
        assert_eq!(available.len(), 2);
        assert!(step.retrigger); // 2 unselected >= min_players(2)
    }

    #[test]
    fn require_player_rejects_all_npc_selection() {
        let mut available = VecDeque::new();
        for i in 0..3 {
            available.push_back(make_bot(&format!("npc{i}"), 1000, Role::Npc));
        }
        let cfg = Config {
            min_players: 2,
            max_players: 6,
            require_player: true,
            ..Config::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let step = attempt_match(&mut available, &cfg, 0, &mut rng);
        assert!(matches!(step.outcome, MatchOutcome::NoHand));
        assert_eq!(available.len(), 3);
    }

    #[test]
    fn hand_limit_reached_short_circuits() {
        let mut available = VecDeque::new();
        available.push_back(make_bot("a", 1000, Role::Player));
        available.push_back(make_bot("b", 1000, Role::Player));
        let cfg = Config {
            min_players: 2,
            hand_limit: 2,
            ..Config::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let step = attempt_match(&mut available, &cfg, 2, &mut rng);
        assert!(matches!(step.outcome, MatchOutcome::HandLimitReached));
    }

    #[test]
    fn zero_chip_bots_are_discarded() {
        let mut available = VecDeque::new();
        available.push_back(make_bot("broke", 0, Role::Player));
        available.push_back(make_bot("a", 1000, Role::Player));
        available.push_back(make_bot("b", 1000, Role::Player));
        let cfg = Config {
            min_players: 2,
            ..Config::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let step = attempt_match(&mut available, &cfg, 0, &mut rng);
        assert_eq!(step.discard_no_chips.len(), 1);
        match step.outcome {
            MatchOutcome::Hand { seats, .. } => assert_eq!(seats.len(), 2),
            _ => panic!("expected a hand"),
        }
    }
}
