//! The pool's single owner task (spec §4.3, §5): `bots` and `available` are
//! touched only here. Everything else interacts through `PoolHandle`'s
//! channels and atomics.
//!
//! The Matcher (spec's "separate goroutine") is folded into this same task —
//! see `super::matcher` for why that's a faithful rendering of "serializes
//! register/unregister and match triggers" rather than a deviation from it.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot, Notify};

use botpoker_shared::{BotId, PlayerStatsSnapshot, Role, ServerFrame};

use crate::bot::Bot;
use crate::config::Config;
use crate::error::PoolError;
use crate::stats::{DetailedStats, HandOutcomeRecord, NullStats, StatsCollector, StatsSummary};

use super::matcher::{self, MatchOutcome};

#[derive(Clone)]
pub struct PlayerStatsEntry {
    pub name: String,
    pub role: Role,
    pub hands_played: u64,
    pub net_chips: i64,
}

/// Reported by a `HandRunner` when a hand finishes (spec §4.3
/// `recordHandOutcome`, folded together with the seat-requeue step that
/// follows completion in §4.3's last paragraph).
pub struct HandCompletionReport {
    pub hand_id: String,
    pub seats: Vec<BotId>,
    pub deltas: Vec<(BotId, i64)>,
    pub stats_records: Vec<HandOutcomeRecord>,
}

enum PoolEvent {
    Register(Arc<Bot>),
    Unregister(BotId),
    HandCompleted(HandCompletionReport),
    Query(oneshot::Sender<PoolSnapshot>),
}

#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub bot_count: usize,
    pub hands_started: u64,
    pub hands_completed: u64,
    pub hands_remaining: Option<u64>,
    pub hand_limit_notified: bool,
    pub player_stats: Vec<PlayerStatsSnapshot>,
    pub stats_summary: StatsSummary,
}

/// Cheap, cloneable front for the pool's owning task. Held by connection
/// tasks (to register/unregister) and by spawned `HandRunner`s (to report
/// completion and bump `timeoutCounter`).
#[derive(Clone)]
pub struct PoolHandle {
    events_tx: mpsc::UnboundedSender<PoolEvent>,
    match_notify: Arc<Notify>,
    stop_notify: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    timeout_counter: Arc<AtomicU64>,
    pub config: Config,
}

impl PoolHandle {
    /// Non-blocking; becomes a no-op once `stop()` has been called (spec
    /// §4.3).
    pub fn register(&self, bot: Arc<Bot>) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        let _ = self.events_tx.send(PoolEvent::Register(bot));
    }

    pub fn unregister(&self, id: BotId) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        let _ = self.events_tx.send(PoolEvent::Unregister(id));
    }

    pub fn hand_completed(&self, report: HandCompletionReport) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        let _ = self.events_tx.send(PoolEvent::HandCompleted(report));
    }

    pub fn increment_timeout_counter(&self) {
        self.timeout_counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeout_count(&self) -> u64 {
        self.timeout_counter.load(Ordering::Relaxed)
    }

    /// Idempotent; `run()` returns promptly and further register/unregister
    /// calls become no-ops (spec §4.3).
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.stop_notify.notify_one();
    }

    pub async fn snapshot(&self) -> Option<PoolSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.events_tx.send(PoolEvent::Query(tx)).ok()?;
        rx.await.ok()
    }
}

pub struct BotPool {
    bots: HashMap<BotId, Arc<Bot>>,
    available: VecDeque<Arc<Bot>>,
    config: Config,
    rng: StdRng,
    hands_started: u64,
    hands_completed: u64,
    hand_limit_notified: bool,
    game_id: String,
    player_stats: HashMap<BotId, PlayerStatsEntry>,
    stats: Box<dyn StatsCollector>,
    events_rx: mpsc::UnboundedReceiver<PoolEvent>,
    match_notify: Arc<Notify>,
    stop_notify: Arc<Notify>,
    handle: PoolHandle,
}

impl BotPool {
    /// Validates the config's player-count invariants (spec §6, SPEC_FULL
    /// §11: "the only error surface that can legitimately abort startup")
    /// before constructing the pool.
    pub fn new(config: Config, game_id: String) -> Result<(Self, PoolHandle), PoolError> {
        if config.min_players == 0 {
            return Err(PoolError::MinPlayersZero);
        }
        if config.min_players > config.max_players {
            return Err(PoolError::MinExceedsMax {
                min: config.min_players,
                max: config.max_players,
            });
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let match_notify = Arc::new(Notify::new());
        let stop_notify = Arc::new(Notify::new());
        let handle = PoolHandle {
            events_tx,
            match_notify: Arc::clone(&match_notify),
            stop_notify: Arc::clone(&stop_notify),
            stopped: Arc::new(AtomicBool::new(false)),
            timeout_counter: Arc::new(AtomicU64::new(0)),
            config: config.clone(),
        };
        let stats: Box<dyn StatsCollector> = if config.enable_stats {
            Box::new(DetailedStats::new(config.stats_depth, config.max_stats_hands))
        } else {
            Box::new(NullStats)
        };
        let rng = if config.seed != 0 {
            StdRng::seed_from_u64(config.seed as u64)
        } else {
            StdRng::from_rng(&mut rand::rng())
        };
        let pool = BotPool {
            bots: HashMap::new(),
            available: VecDeque::new(),
            config,
            rng,
            hands_started: 0,
            hands_completed: 0,
            hand_limit_notified: false,
            game_id,
            player_stats: HashMap::new(),
            stats,
            events_rx,
            match_notify,
            stop_notify,
            handle: handle.clone(),
        };
        Ok((pool, handle))
    }

    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    /// The single owner of `bots` and `available`; runs until `stop()`.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                _ = self.stop_notify.notified() => {
                    tracing::info!("bot pool stopping");
                    break;
                }
                event = self.events_rx.recv() => {
                    match event {
                        Some(ev) => self.handle_event(ev),
                        None => break,
                    }
                }
                _ = self.match_notify.notified() => {
                    self.try_match();
                }
            }
        }
    }

    fn handle_event(&mut self, event: PoolEvent) {
        match event {
            PoolEvent::Register(bot) => self.on_register(bot),
            PoolEvent::Unregister(id) => self.on_unregister(&id),
            PoolEvent::HandCompleted(report) => self.on_hand_completed(report),
            PoolEvent::Query(tx) => {
                let _ = tx.send(self.snapshot());
            }
        }
    }

    fn on_register(&mut self, bot: Arc<Bot>) {
        let id = bot.id.clone();
        tracing::info!(bot_id = %id, "bot registered");
        let seated = bot.in_hand();
        self.bots.insert(id, Arc::clone(&bot));
        if !seated {
            self.enqueue_available(bot);
        }
        self.trigger_match();
    }

    fn on_unregister(&mut self, id: &BotId) {
        self.do_unregister(id);
        tracing::info!(bot_id = %id, "bot unregistered");
    }

    fn do_unregister(&mut self, id: &BotId) {
        if let Some(bot) = self.bots.remove(id) {
            bot.close();
        }
        self.available.retain(|b| &b.id != id);
    }

    fn enqueue_available(&mut self, bot: Arc<Bot>) {
        if self.available.len() >= self.config.available_capacity() {
            tracing::warn!(bot_id = %bot.id, "available queue at capacity; bot will not be matched until re-registered");
            return;
        }
        self.available.push_back(bot);
    }

    fn on_hand_completed(&mut self, report: HandCompletionReport) {
        self.hands_completed += 1;
        tracing::info!(hand_id = %report.hand_id, seats = report.seats.len(), "hand completed");

        for (id, delta) in &report.deltas {
            if let Some(bot) = self.bots.get(id) {
                bot.adjust_bankroll(*delta, self.config.infinite_bankroll);
            }
            let entry = self.player_stats.entry(id.clone()).or_insert_with(|| {
                let (name, role) = self
                    .bots
                    .get(id)
                    .map(|b| (b.name(), b.role()))
                    .unwrap_or_else(|| (id.to_string(), Role::Player));
                PlayerStatsEntry {
                    name,
                    role,
                    hands_played: 0,
                    net_chips: 0,
                }
            });
            entry.hands_played += 1;
            entry.net_chips += delta;
        }

        for id in &report.seats {
            if let Some(bot) = self.bots.get(id).cloned() {
                bot.set_in_hand(false);
                if bot.is_closed() || !bot.has_chips(self.config.infinite_bankroll) {
                    self.do_unregister(id);
                } else {
                    self.enqueue_available(bot);
                }
            }
        }

        self.stats.record_hand(&report.stats_records);

        if self.config.hand_limit > 0
            && self.hands_completed >= self.config.hand_limit
            && !self.hand_limit_notified
        {
            self.hand_limit_notified = true;
            self.broadcast_game_completed("hand_limit_reached");
        }

        self.trigger_match();
    }

    fn try_match(&mut self) {
        let step = matcher::attempt_match(
            &mut self.available,
            &self.config,
            self.hands_started,
            &mut self.rng,
        );
        for bot in step.discard_no_chips {
            self.do_unregister(&bot.id.clone());
        }
        match step.outcome {
            MatchOutcome::HandLimitReached => {
                tracing::debug!("hand limit reached; suppressing new matches");
            }
            MatchOutcome::NoHand => {}
            MatchOutcome::Hand { seats, seed } => {
                self.hands_started += 1;
                let hand_id = format!("hand-{}", self.hands_started);
                for s in &seats {
                    s.set_in_hand(true);
                }
                tracing::info!(hand_id = %hand_id, seat_count = seats.len(), "hand spawned");
                let cfg = self.config.clone();
                let handle = self.handle.clone();
                tokio::spawn(async move {
                    crate::hand::runner::run_hand(hand_id, seats, cfg, seed, handle).await;
                });
            }
        }
        if step.retrigger {
            self.trigger_match();
        }
    }

    fn trigger_match(&self) {
        self.match_notify.notify_one();
    }

    fn broadcast_game_completed(&self, reason: &str) {
        let mut players: Vec<PlayerStatsSnapshot> = self
            .player_stats
            .iter()
            .map(|(id, e)| PlayerStatsSnapshot {
                name: e.name.clone(),
                role: e.role,
                bot_id: id.to_string(),
                hands_played: e.hands_played,
                net_chips: e.net_chips,
            })
            .collect();
        players.sort_by(|a, b| {
            a.role
                .cmp(&b.role)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.bot_id.cmp(&b.bot_id))
        });

        let frame = ServerFrame::GameCompleted {
            game_id: self.game_id.clone(),
            hands_completed: self.hands_completed,
            hand_limit: self.config.hand_limit,
            reason: reason.to_string(),
            seed: self.config.seed,
            players,
        };
        for bot in self.bots.values() {
            if bot.is_closed() {
                continue;
            }
            if bot.send(frame.clone()).is_err() {
                tracing::debug!(bot_id = %bot.id, "game_completed send failed (backpressure)");
            }
        }
    }

    fn snapshot(&self) -> PoolSnapshot {
        let mut players: Vec<PlayerStatsSnapshot> = self
            .player_stats
            .iter()
            .map(|(id, e)| PlayerStatsSnapshot {
                name: e.name.clone(),
                role: e.role,
                bot_id: id.to_string(),
                hands_played: e.hands_played,
                net_chips: e.net_chips,
            })
            .collect();
        players.sort_by(|a, b| {
            a.role
                .cmp(&b.role)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.bot_id.cmp(&b.bot_id))
        });

        PoolSnapshot {
            bot_count: self.bots.len(),
            hands_started: self.hands_started,
            hands_completed: self.hands_completed,
            hands_remaining: if self.config.hand_limit > 0 {
                Some(self.config.hand_limit.saturating_sub(self.hands_completed))
            } else {
                None
            },
            hand_limit_notified: self.hand_limit_notified,
            player_stats: players,
            stats_summary: self.stats.summary(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_min_players_zero() {
        let cfg = Config {
            min_players: 0,
            ..Config::default()
        };
        assert_eq!(
            BotPool::new(cfg, "g".into()).unwrap_err(),
            PoolError::MinPlayersZero
        );
    }

    #[test]
    fn new_rejects_min_exceeding_max() {
        let cfg = Config {
            min_players: 4,
            max_players: 2,
            ..Config::default()
        };
        assert_eq!(
            BotPool::new(cfg, "g".into()).unwrap_err(),
            PoolError::MinExceedsMax { min: 4, max: 2 }
        );
    }

    #[test]
    fn new_accepts_valid_config() {
        let cfg = Config::default();
        assert!(BotPool::new(cfg, "g".into()).is_ok());
    }
}
