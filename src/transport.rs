//! Transport abstraction consumed by [`crate::bot::Bot`].
//!
//! Connection lifecycle (accept/upgrade/close) and wire framing are out of
//! scope for this crate (spec §1); `TransportReader`/`TransportWriter` are
//! the seam a real websocket or iroh transport would implement, split the
//! way the teacher's read/write loops are split across two tasks per
//! connection.

use async_trait::async_trait;
use botpoker_shared::{ClientFrame, ServerFrame};

/// Reads decoded client frames off one connection. Returns `None` once the
/// connection is closed or a frame fails to decode — the Bot read loop
/// treats both the same way (spec §4.1: "Any decode error or transport
/// error closes the bot").
#[async_trait]
pub trait TransportReader: Send {
    async fn recv(&mut self) -> Option<ClientFrame>;
}

/// Writes server frames to one connection.
#[async_trait]
pub trait TransportWriter: Send {
    async fn send(&mut self, frame: ServerFrame) -> anyhow::Result<()>;
}
