//! The Bot actor: per-connection state, read loop, write loop (spec §4.1).
//!
//! A `Bot` is shared (`Arc<Bot>`) between its connection's read/write tasks,
//! the `BotPool`, and whichever `HandRunner` currently has it seated. Mutable
//! fields that the spec calls out as needing a lock (`inHand`, `closed`,
//! `bankroll`, the attached inbox) live behind one synchronous mutex — every
//! critical section here is a handful of field reads/writes, never an
//! `.await`, matching spec §5's "protected by a per-bot mutex". The send
//! queue is a channel.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};

use botpoker_shared::{ActionEnvelope, BotId, Role, ServerFrame};

use crate::error::BackpressureError;
use crate::pool::PoolHandle;
use crate::transport::{TransportReader, TransportWriter};

struct BotState {
    name: String,
    role: Role,
    bankroll: u32,
    in_hand: bool,
    closed: bool,
    inbox: Option<mpsc::UnboundedSender<ActionEnvelope>>,
}

/// A connected participant (spec §3 "Bot").
pub struct Bot {
    pub id: BotId,
    state: Mutex<BotState>,
    send_tx: mpsc::Sender<ServerFrame>,
    done_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

impl Bot {
    fn new(
        id: BotId,
        name: String,
        role: Role,
        bankroll: u32,
        buffer: usize,
    ) -> (Arc<Self>, mpsc::Receiver<ServerFrame>) {
        let (send_tx, send_rx) = mpsc::channel(buffer);
        let (done_tx, done_rx) = watch::channel(false);
        let bot = Arc::new(Self {
            id,
            state: Mutex::new(BotState {
                name,
                role,
                bankroll,
                in_hand: false,
                closed: false,
                inbox: None,
            }),
            send_tx,
            done_tx,
            done_rx,
        });
        (bot, send_rx)
    }

    /// Enqueue one frame. Fails with `BackpressureError` if the outbound
    /// queue is full (or the write loop already exited); the caller treats
    /// this as "bot unresponsive" (force-fold if seated, disconnect
    /// otherwise — spec §4.1, §7).
    pub fn send(&self, frame: ServerFrame) -> Result<(), BackpressureError> {
        self.send_tx.try_send(frame).map_err(|_| BackpressureError)
    }

    /// Called by the read loop for an inbound `action` frame. Publishes on
    /// the currently attached inbox; if nothing is attached the envelope is
    /// dropped (spec §4.1).
    pub fn deliver_action(&self, env: ActionEnvelope) {
        let state = self.state.lock().unwrap();
        if let Some(tx) = &state.inbox {
            let _ = tx.send(env);
        }
    }

    /// Attach an inbox for the duration of one hand. Returns a guard that
    /// detaches it on drop — the waiter in `HandRunner::wait_for_action`
    /// MUST release the inbox on every exit path (spec §4.4.1).
    pub fn set_inbox(self: &Arc<Self>, tx: mpsc::UnboundedSender<ActionEnvelope>) -> InboxGuard {
        self.state.lock().unwrap().inbox = Some(tx);
        InboxGuard {
            bot: Arc::clone(self),
        }
    }

    fn clear_inbox(&self) {
        self.state.lock().unwrap().inbox = None;
    }

    /// Fires once the connection closes. Returns immediately if already
    /// closed.
    pub async fn done(&self) {
        let mut rx = self.done_rx.clone();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }

    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return;
        }
        state.closed = true;
        let _ = self.done_tx.send(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.done_rx.borrow()
    }

    pub fn has_chips(&self, infinite_bankroll: bool) -> bool {
        infinite_bankroll || self.state.lock().unwrap().bankroll > 0
    }

    /// The minimum of bankroll and the configured start-chips.
    pub fn buy_in(&self, start_chips: u32, infinite_bankroll: bool) -> u32 {
        if infinite_bankroll {
            return start_chips;
        }
        self.state.lock().unwrap().bankroll.min(start_chips)
    }

    pub fn adjust_bankroll(&self, delta: i64, infinite_bankroll: bool) {
        if infinite_bankroll {
            return;
        }
        let mut state = self.state.lock().unwrap();
        state.bankroll = (state.bankroll as i64 + delta).max(0) as u32;
    }

    pub fn bankroll(&self) -> u32 {
        self.state.lock().unwrap().bankroll
    }

    pub fn in_hand(&self) -> bool {
        self.state.lock().unwrap().in_hand
    }

    /// Transitions false→true only by the `Matcher`, true→false only by the
    /// `HandRunner` on completion (spec §3 invariant).
    pub fn set_in_hand(&self, v: bool) {
        self.state.lock().unwrap().in_hand = v;
    }

    pub fn role(&self) -> Role {
        self.state.lock().unwrap().role
    }

    pub fn name(&self) -> String {
        self.state.lock().unwrap().name.clone()
    }

    pub fn set_identity(&self, name: String, role: Option<Role>) {
        let mut state = self.state.lock().unwrap();
        state.name = name;
        if let Some(r) = role {
            state.role = r;
        }
    }

    /// Construct a standalone bot with no backing connection, for tests that
    /// exercise the pool/matcher/runner without a real transport.
    #[cfg(test)]
    pub(crate) fn test_new(
        id: &str,
        chips: u32,
        role: Role,
    ) -> (Arc<Self>, mpsc::Receiver<ServerFrame>) {
        Self::new(BotId::from(id), id.to_string(), role, chips, 32)
    }

    /// Construct a bot with no backing transport connection. Used by the
    /// demo binary to seat NPCs directly, since wire-level connection
    /// handling is out of scope here (spec §1).
    pub fn spawn_standalone(
        id: BotId,
        name: String,
        role: Role,
        chips: u32,
        buffer: usize,
    ) -> (Arc<Self>, mpsc::Receiver<ServerFrame>) {
        Self::new(id, name, role, chips, buffer)
    }
}

/// RAII guard realizing attach/detach as "the routing" (spec §4.2): no
/// cross-hand routing table exists, only this guard's lifetime.
pub struct InboxGuard {
    bot: Arc<Bot>,
}

impl Drop for InboxGuard {
    fn drop(&mut self) {
        self.bot.clear_inbox();
    }
}

/// Spawn the read and write loop tasks for one freshly accepted connection.
/// Blocks until a `connect` frame is received (spec §4.1: "created on
/// transport accept after a `connect` frame is received"), then registers
/// with the pool and returns the `Bot` handle.
pub async fn accept_connection(
    id: BotId,
    mut reader: Box<dyn TransportReader>,
    mut writer: Box<dyn TransportWriter>,
    pool: PoolHandle,
    buffer: usize,
    start_chips: u32,
) -> Option<Arc<Bot>> {
    use botpoker_shared::ClientFrame;

    let first = reader.recv().await?;
    let (name, role) = match first {
        ClientFrame::Connect(c) => (c.name, c.role.unwrap_or(Role::Player)),
        _ => {
            tracing::debug!(bot_id = %id, "first frame was not connect; dropping connection");
            return None;
        }
    };

    let (bot, mut send_rx) = Bot::new(id.clone(), name, role, start_chips, buffer);

    tokio::spawn({
        let bot = Arc::clone(&bot);
        async move {
            while let Some(frame) = send_rx.recv().await {
                if writer.send(frame).await.is_err() {
                    break;
                }
            }
            bot.close();
        }
    });

    tokio::spawn({
        let bot = Arc::clone(&bot);
        let pool = pool.clone();
        async move {
            loop {
                match reader.recv().await {
                    Some(ClientFrame::Action(action)) => {
                        let env = ActionEnvelope {
                            bot_id: bot.id.clone(),
                            action,
                        };
                        bot.deliver_action(env);
                    }
                    Some(ClientFrame::Connect(c)) => {
                        bot.set_identity(c.name, c.role);
                    }
                    None => break,
                }
            }
            bot.close();
            pool.unregister(bot.id.clone());
        }
    });

    pool.register(Arc::clone(&bot));
    Some(bot)
}
