//! HandRunner: drives one hand end to end (spec §4.4).
//!
//! `run_hand` owns the `HandEngine` exclusively for the lifetime of the hand
//! (spec §5: "`HandRunner.engine`: exclusively owned by that runner's
//! task"). It is spawned by `BotPool::try_match` and reports back through
//! `PoolHandle::hand_completed` on exit — there is no other return path.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::sync::mpsc;

use botpoker_shared::{
    fresh_deck, normalize_action, ActionFrame, ActionLabel, PlayerUpdate, Role, SeatInfo,
    ServerFrame, ShowdownEntry, Street, WinnerInfo,
};

use crate::bot::Bot;
use crate::config::Config;
use crate::npc::{NpcContext, NpcStrategy, SimpleNpcStrategy};
use crate::pool::{HandCompletionReport, PoolHandle};
use crate::stats::{categorize_hole, position_bucket, HandOutcomeRecord};

use super::engine::HandEngine;
use super::table_engine::TableEngine;

/// What `wait_for_action` resolved to; `ForcedFold` covers both the timeout
/// and the disconnect race (spec §4.4.1).
enum ActionOutcome {
    Client(ActionFrame),
    ForcedFold,
}

pub async fn run_hand(
    hand_id: String,
    seats: Vec<Arc<Bot>>,
    config: Config,
    seed: u64,
    pool: PoolHandle,
) {
    let n = seats.len();
    let button = 0usize;
    let buy_ins: Vec<u32> = seats
        .iter()
        .map(|b| b.buy_in(config.start_chips, config.infinite_bankroll))
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut deck = fresh_deck();
    deck.shuffle(&mut rng);

    let mut engine: Box<dyn HandEngine> = Box::new(TableEngine::new(
        buy_ins.clone(),
        button,
        config.small_blind,
        config.big_blind,
        deck,
    ));

    let hole_categories: Vec<_> = (0..n)
        .map(|s| categorize_hole(engine.hole_cards(s)))
        .collect();
    let mut street_reached = vec![Street::Preflop; n];

    broadcast_hand_start(&hand_id, &seats, &*engine, button, &config);
    broadcast_blind_posts(&hand_id, &seats, &*engine, button, n);

    let npc_strategy = SimpleNpcStrategy::default();
    let mut last_street = engine.current_street();

    'betting: while !engine.is_complete() {
        if let Some(active) = engine.active_seat() {
            for seat in 0..n {
                if seat != active && seats[seat].is_closed() && !engine.seat_folded(seat) {
                    street_reached[seat] = engine.current_street();
                    engine.force_fold(seat);
                    broadcast_player_action(&hand_id, &seats, &*engine, seat, ActionLabel::TimeoutFold, 0);
                    broadcast_game_update(&hand_id, &seats, &*engine);
                    if engine.current_street() != last_street {
                        broadcast_street_change(&hand_id, &seats, &*engine);
                        last_street = engine.current_street();
                    }
                    continue 'betting;
                }
            }
        }

        let active = match engine.active_seat() {
            Some(a) => a,
            None => break,
        };
        if engine.valid_actions().is_empty() {
            break;
        }

        if seats[active].is_closed() {
            street_reached[active] = engine.current_street();
            engine.force_fold(active);
            broadcast_player_action(&hand_id, &seats, &*engine, active, ActionLabel::TimeoutFold, 0);
            broadcast_game_update(&hand_id, &seats, &*engine);
            if engine.current_street() != last_street {
                broadcast_street_change(&hand_id, &seats, &*engine);
                last_street = engine.current_street();
            }
            continue;
        }

        let pot = engine.pot();
        let to_call = engine.to_call(active);
        let min_bet = engine.min_bet();
        let min_raise = engine.min_raise();
        let valid_actions = engine.valid_actions();

        let outcome = if seats[active].role() == Role::Npc {
            let ctx = NpcContext {
                stack: engine.seat_chips(active),
                to_call,
                pot,
                min_raise,
                big_blind: config.big_blind,
            };
            let env = npc_strategy.decide(&seats[active].id, &ctx);
            ActionOutcome::Client(env.action)
        } else if seats[active]
            .send(ServerFrame::ActionRequest {
                hand_id: hand_id.clone(),
                pot,
                to_call,
                min_bet,
                min_raise,
                valid_actions,
                time_remaining_ms: config.timeout_ms,
            })
            .is_err()
        {
            // Backpressure on the active seat's action_request force-folds it
            // immediately (spec §4.4.3, §7).
            ActionOutcome::ForcedFold
        } else {
            wait_for_action(&seats[active], config.timeout_ms, &pool).await
        };

        if matches!(outcome, ActionOutcome::ForcedFold) {
            street_reached[active] = engine.current_street();
        }
        apply_outcome(&hand_id, &seats, &mut *engine, active, outcome, &mut street_reached);

        if engine.current_street() != last_street {
            broadcast_street_change(&hand_id, &seats, &*engine);
            last_street = engine.current_street();
        }
    }

    // All remaining active seats are all-in: fast-forward the board without
    // soliciting action, broadcasting each street change (spec §4.4.2).
    while !engine.is_complete() {
        if engine.advance_street().is_err() {
            break;
        }
        if engine.current_street() != last_street {
            broadcast_street_change(&hand_id, &seats, &*engine);
            last_street = engine.current_street();
        }
    }

    for seat in 0..n {
        if !engine.seat_folded(seat) {
            street_reached[seat] = Street::Showdown;
        }
    }

    broadcast_hand_result(&hand_id, &seats, &*engine);

    let winners: HashSet<usize> = engine.get_winners().into_iter().flatten().collect();
    let showdown_seats: HashSet<usize> = engine
        .showdown_results()
        .iter()
        .map(|r| r.seat)
        .collect();

    let deltas: Vec<_> = (0..n)
        .map(|seat| {
            (
                seats[seat].id.clone(),
                engine.seat_chips(seat) as i64 - buy_ins[seat] as i64,
            )
        })
        .collect();

    let stats_records: Vec<HandOutcomeRecord> = (0..n)
        .map(|seat| HandOutcomeRecord {
            hand_id: hand_id.clone(),
            bot_id: seats[seat].id.clone(),
            role: seats[seat].role(),
            seat,
            big_blind: config.big_blind,
            net_chips: engine.seat_chips(seat) as i64 - buy_ins[seat] as i64,
            went_to_showdown: showdown_seats.contains(&seat),
            won_at_showdown: showdown_seats.contains(&seat) && winners.contains(&seat),
            won_hand: winners.contains(&seat),
            street_reached: street_reached[seat],
            hole_category: Some(hole_categories[seat]),
            position: position_bucket(seat, button, n),
        })
        .collect();

    pool.hand_completed(HandCompletionReport {
        hand_id,
        seats: seats.iter().map(|b| b.id.clone()).collect(),
        deltas,
        stats_records,
    });
}

/// Attach the bot's inbox, race it against `done()` and a decision timer,
/// and detach on every exit path via `InboxGuard`'s `Drop` (spec §4.4.1).
async fn wait_for_action(bot: &Arc<Bot>, timeout_ms: u64, pool: &PoolHandle) -> ActionOutcome {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _guard = bot.set_inbox(tx);
    let sleep = tokio::time::sleep(Duration::from_millis(timeout_ms));
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            maybe_env = rx.recv() => {
                match maybe_env {
                    Some(env) if env.bot_id == bot.id => return ActionOutcome::Client(env.action),
                    Some(env) => {
                        tracing::warn!(
                            expected = %bot.id,
                            got = %env.bot_id,
                            "SECURITY: cross-seat action rejected"
                        );
                        continue;
                    }
                    None => return ActionOutcome::ForcedFold,
                }
            }
            _ = bot.done() => return ActionOutcome::ForcedFold,
            _ = &mut sleep => {
                pool.increment_timeout_counter();
                return ActionOutcome::ForcedFold;
            }
        }
    }
}

fn apply_outcome(
    hand_id: &str,
    seats: &[Arc<Bot>],
    engine: &mut dyn HandEngine,
    active: usize,
    outcome: ActionOutcome,
    street_reached: &mut [Street],
) {
    match outcome {
        ActionOutcome::ForcedFold => {
            engine.force_fold(active);
            broadcast_player_action(hand_id, seats, engine, active, ActionLabel::TimeoutFold, 0);
        }
        ActionOutcome::Client(frame) => {
            let to_call = engine.to_call(active);
            let stack = engine.seat_chips(active);
            let (normalized, label) = normalize_action(frame.action, frame.amount, to_call, stack);
            let before = engine.seat_chips(active);
            match engine.apply_action(active, normalized) {
                Ok(()) => {
                    let paid = before.saturating_sub(engine.seat_chips(active));
                    broadcast_player_action(hand_id, seats, engine, active, label, paid);
                }
                Err(e) => {
                    tracing::error!(bot_id = %seats[active].id, error = %e, "invalid action; forcing fold");
                    street_reached[active] = engine.current_street();
                    engine.force_fold(active);
                    broadcast_player_action(
                        hand_id,
                        seats,
                        engine,
                        active,
                        ActionLabel::TimeoutFold,
                        0,
                    );
                }
            }
        }
    }
    broadcast_game_update(hand_id, seats, engine);
}

fn broadcast_hand_start(
    hand_id: &str,
    seats: &[Arc<Bot>],
    engine: &dyn HandEngine,
    button: usize,
    config: &Config,
) {
    let players: Vec<SeatInfo> = seats
        .iter()
        .enumerate()
        .map(|(i, b)| SeatInfo {
            name: b.name(),
            chips: engine.seat_chips(i),
            seat: i,
        })
        .collect();
    for (seat, bot) in seats.iter().enumerate() {
        let _ = bot.send(ServerFrame::HandStart {
            hand_id: hand_id.to_string(),
            players: players.clone(),
            button,
            your_seat: seat,
            hole_cards: engine.hole_cards(seat),
            small_blind: config.small_blind,
            big_blind: config.big_blind,
        });
    }
}

fn broadcast_blind_posts(hand_id: &str, seats: &[Arc<Bot>], engine: &dyn HandEngine, button: usize, n: usize) {
    let (sb_idx, bb_idx) = if n == 2 {
        (button, (button + 1) % n)
    } else {
        ((button + 1) % n, (button + 2) % n)
    };
    broadcast_player_action(
        hand_id,
        seats,
        engine,
        sb_idx,
        ActionLabel::PostSmallBlind,
        engine.seat_bet(sb_idx),
    );
    broadcast_player_action(
        hand_id,
        seats,
        engine,
        bb_idx,
        ActionLabel::PostBigBlind,
        engine.seat_bet(bb_idx),
    );
    broadcast_game_update(hand_id, seats, engine);
}

fn broadcast_player_action(
    hand_id: &str,
    seats: &[Arc<Bot>],
    engine: &dyn HandEngine,
    seat: usize,
    label: ActionLabel,
    amount_paid: u32,
) {
    let frame = ServerFrame::PlayerAction {
        hand_id: hand_id.to_string(),
        street: engine.current_street(),
        seat,
        player_name: seats[seat].name(),
        action: label,
        amount_paid,
        player_bet: engine.seat_bet(seat),
        player_chips: engine.seat_chips(seat),
        pot: engine.pot(),
    };
    send_best_effort(seats, frame);
}

fn broadcast_game_update(hand_id: &str, seats: &[Arc<Bot>], engine: &dyn HandEngine) {
    let players: Vec<PlayerUpdate> = (0..engine.seat_count())
        .map(|i| PlayerUpdate {
            seat: i,
            name: seats[i].name(),
            chips: engine.seat_chips(i),
            bet: engine.seat_bet(i),
            total_bet: engine.seat_total_bet(i),
            folded: engine.seat_folded(i),
            all_in: engine.seat_all_in(i),
        })
        .collect();
    send_best_effort(
        seats,
        ServerFrame::GameUpdate {
            hand_id: hand_id.to_string(),
            pot: engine.pot(),
            players,
        },
    );
}

fn broadcast_street_change(hand_id: &str, seats: &[Arc<Bot>], engine: &dyn HandEngine) {
    send_best_effort(
        seats,
        ServerFrame::StreetChange {
            hand_id: hand_id.to_string(),
            street: engine.current_street(),
            board: engine.board(),
        },
    );
}

fn broadcast_hand_result(hand_id: &str, seats: &[Arc<Bot>], engine: &dyn HandEngine) {
    let showdown: Vec<ShowdownEntry> = engine
        .showdown_results()
        .into_iter()
        .map(|r| ShowdownEntry {
            seat: r.seat,
            name: seats[r.seat].name(),
            hole_cards: engine.hole_cards(r.seat),
            hand_rank: r.rank,
        })
        .collect();

    let winners: Vec<WinnerInfo> = engine
        .winner_payouts()
        .into_iter()
        .map(|(seat, amount)| WinnerInfo {
            name: seats[seat].name(),
            amount,
            hole_cards: engine.hole_cards(seat),
            hand_rank: showdown
                .iter()
                .find(|e| e.seat == seat)
                .map(|e| e.hand_rank.clone())
                .unwrap_or(botpoker_shared::HandRank {
                    category: botpoker_shared::HandRankCategory::HighCard,
                    tiebreakers: Vec::new(),
                }),
        })
        .collect();

    send_best_effort(
        seats,
        ServerFrame::HandResult {
            hand_id: hand_id.to_string(),
            winners,
            board: engine.board(),
            showdown,
        },
    );
}

/// Sequential per-bot send, never parallel — ordering is cheaper to preserve
/// than any throughput gained from fanning out (spec §9).
fn send_best_effort(seats: &[Arc<Bot>], frame: ServerFrame) {
    for bot in seats {
        if bot.is_closed() {
            continue;
        }
        if bot.send(frame.clone()).is_err() {
            tracing::debug!(bot_id = %bot.id, "broadcast send failed (backpressure)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botpoker_shared::BotId;

    #[tokio::test]
    async fn wait_for_action_times_out_and_counts() {
        let (bot, _rx) = Bot::test_new("a", 1000, Role::Player);
        let cfg = Config::default();
        let (pool, handle) = crate::pool::BotPool::new(cfg, "g".into()).unwrap();
        tokio::spawn(pool.run());
        let outcome = wait_for_action(&bot, 20, &handle).await;
        assert!(matches!(outcome, ActionOutcome::ForcedFold));
        assert_eq!(handle.timeout_count(), 1);
    }

    #[tokio::test]
    async fn wait_for_action_rejects_wrong_sender() {
        let (bot, _rx) = Bot::test_new("a", 1000, Role::Player);
        let cfg = Config::default();
        let (pool, handle) = crate::pool::BotPool::new(cfg, "g".into()).unwrap();
        tokio::spawn(pool.run());

        let imposter = ActionFrame {
            action: botpoker_shared::ClientActionKind::Raise,
            amount: 30,
        };
        bot.deliver_action(botpoker_shared::ActionEnvelope {
            bot_id: BotId::from("not-a"),
            action: imposter,
        });
        let outcome = wait_for_action(&bot, 20, &handle).await;
        assert!(matches!(outcome, ActionOutcome::ForcedFold));
    }
}
