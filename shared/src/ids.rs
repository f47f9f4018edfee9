//! Bot identity and role.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned, stable identifier for a connected bot.
///
/// Stamped onto every inbound action by the connection's read loop; never
/// trusted from the wire payload (see `ActionEnvelope`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BotId(pub String);

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for BotId {
    fn from(v: String) -> Self {
        BotId(v)
    }
}

impl From<&str> for BotId {
    fn from(v: &str) -> Self {
        BotId(v.to_string())
    }
}

/// A bot's closed set of roles. NPCs differ only in that they have no
/// transport backing them; the `HandRunner` consults a strategy hook for
/// their actions instead of waiting on an inbox (see `crate::npc`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Player,
    Npc,
}
