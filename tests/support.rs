//! In-memory `Transport` test double (SPEC_FULL §13): channel-backed
//! `TransportReader`/`TransportWriter` standing in for a real socket, so
//! integration tests drive the concurrency core through its actual public
//! API (`bot::accept_connection`) without a wire-level transport.

use async_trait::async_trait;
use tokio::sync::mpsc;

use botpoker::bot::{self, Bot};
use botpoker::config::Config;
use botpoker::pool::PoolHandle;
use botpoker_shared::{ClientFrame, ConnectFrame, Role, ServerFrame};
use std::sync::Arc;

struct ChannelReader {
    rx: mpsc::UnboundedReceiver<ClientFrame>,
}

#[async_trait]
impl botpoker::transport::TransportReader for ChannelReader {
    async fn recv(&mut self) -> Option<ClientFrame> {
        self.rx.recv().await
    }
}

struct ChannelWriter {
    tx: mpsc::UnboundedSender<ServerFrame>,
}

#[async_trait]
impl botpoker::transport::TransportWriter for ChannelWriter {
    async fn send(&mut self, frame: ServerFrame) -> anyhow::Result<()> {
        self.tx
            .send(frame)
            .map_err(|_| anyhow::anyhow!("receiver dropped"))
    }
}

/// A simulated connection: push `ClientFrame`s in, drain `ServerFrame`s out.
/// Dropping `client_tx` simulates a disconnect (the bot's read loop sees its
/// channel close and calls `Bot::close`).
pub struct FakeConn {
    pub client_tx: mpsc::UnboundedSender<ClientFrame>,
    pub server_rx: mpsc::UnboundedReceiver<ServerFrame>,
}

/// Connect one simulated bot and wait for it to register.
pub async fn connect_bot(pool: PoolHandle, name: &str, role: Role, cfg: &Config) -> (Arc<Bot>, FakeConn) {
    let (client_tx, client_rx) = mpsc::unbounded_channel();
    let (server_tx, server_rx) = mpsc::unbounded_channel();

    client_tx
        .send(ClientFrame::Connect(ConnectFrame {
            name: name.to_string(),
            role: Some(role),
        }))
        .unwrap();

    let reader = Box::new(ChannelReader { rx: client_rx });
    let writer = Box::new(ChannelWriter { tx: server_tx });

    let bot = bot::accept_connection(
        botpoker_shared::BotId::from(name),
        reader,
        writer,
        pool,
        cfg.channel_buffer_size,
        cfg.start_chips,
    )
    .await
    .expect("connect frame accepted");

    (bot, FakeConn { client_tx, server_rx })
}

/// Drain frames from `conn` until `pred` matches one, returning it. Panics if
/// the connection closes first.
pub async fn recv_until(
    conn: &mut FakeConn,
    pred: impl Fn(&ServerFrame) -> bool,
) -> ServerFrame {
    loop {
        match conn.server_rx.recv().await {
            Some(frame) if pred(&frame) => return frame,
            Some(_) => continue,
            None => panic!("connection closed before matching frame arrived"),
        }
    }
}

/// Drain frames from `conn` until an `action_request` arrives, or the
/// connection closes (`None`). Used to find out which seat is currently
/// active without assuming a fixed turn order.
pub async fn recv_action_request(conn: &mut FakeConn) -> Option<ServerFrame> {
    loop {
        match conn.server_rx.recv().await {
            Some(f @ ServerFrame::ActionRequest { .. }) => return Some(f),
            Some(_) => continue,
            None => return None,
        }
    }
}

/// Simulate a disconnect: drop the real sender feeding the bot's read loop so
/// its next `recv` sees the channel close, without needing ownership of
/// `conn` itself.
pub fn disconnect(conn: &mut FakeConn) {
    let (dummy_tx, _dummy_rx) = mpsc::unbounded_channel();
    let real_tx = std::mem::replace(&mut conn.client_tx, dummy_tx);
    drop(real_tx);
}
