//! Wire protocol between a bot and the server.
//!
//! Framing itself (how these values are delimited on the byte stream) is a
//! transport concern and lives behind the `Transport`/`Codec` traits in the
//! core crate; this module only fixes the typed payloads that cross the
//! wire, mirroring the way `mcg-shared::messages` separates protocol types
//! from the axum/iroh transports that carry them.

use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::hand::HandRank;

/// The street of a poker hand. Ordered `Preflop < Flop < Turn < River <
/// Showdown` so callers can bucket "street reached" for stats breakdowns.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

/// The verbs a connected bot may send for its own seat.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClientActionKind {
    Fold,
    Call,
    Raise,
    AllIn,
}

/// The normalized action set the `HandEngine` and broadcasts use. A superset
/// of `ClientActionKind` by one member (`Check`), since `call` normalizes to
/// `Check` when nothing is owed (see `crate::normalize_action`).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionLabel {
    Fold,
    Check,
    Call,
    Raise,
    AllIn,
    /// Forced blind posts, broadcast before the betting loop starts (spec
    /// §4.4 step 4). Not part of the client→engine normalization table.
    #[serde(rename = "post_small_blind")]
    PostSmallBlind,
    #[serde(rename = "post_big_blind")]
    PostBigBlind,
    /// Forced fold from a decision timeout or a disconnected active seat
    /// (spec §4.4 step 5g, §7).
    #[serde(rename = "timeout_fold")]
    TimeoutFold,
}

/// `connect` — client → server, once, before any action.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectFrame {
    pub name: String,
    #[serde(default)]
    pub role: Option<crate::Role>,
}

/// `action` — client → server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionFrame {
    pub action: ClientActionKind,
    #[serde(default)]
    pub amount: u32,
}

/// Frames a bot may send to the server.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientFrame {
    Connect(ConnectFrame),
    Action(ActionFrame),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeatInfo {
    pub name: String,
    pub chips: u32,
    pub seat: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerUpdate {
    pub seat: usize,
    pub name: String,
    pub chips: u32,
    pub bet: u32,
    pub total_bet: u32,
    pub folded: bool,
    pub all_in: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WinnerInfo {
    pub name: String,
    pub amount: u32,
    pub hole_cards: [Card; 2],
    pub hand_rank: HandRank,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShowdownEntry {
    pub seat: usize,
    pub name: String,
    pub hole_cards: [Card; 2],
    pub hand_rank: HandRank,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerStatsSnapshot {
    pub name: String,
    pub role: crate::Role,
    pub bot_id: String,
    pub hands_played: u64,
    pub net_chips: i64,
}

/// Frames the server sends to bots.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerFrame {
    /// Sent individually per seat; `hole_cards` differs per recipient, every
    /// other field is identical across seats (spec §4.4 step 3).
    HandStart {
        hand_id: String,
        players: Vec<SeatInfo>,
        button: usize,
        your_seat: usize,
        hole_cards: [Card; 2],
        small_blind: u32,
        big_blind: u32,
    },
    ActionRequest {
        hand_id: String,
        pot: u32,
        to_call: u32,
        min_bet: u32,
        min_raise: u32,
        valid_actions: Vec<ActionLabel>,
        time_remaining_ms: u64,
    },
    PlayerAction {
        hand_id: String,
        street: Street,
        seat: usize,
        player_name: String,
        action: ActionLabel,
        amount_paid: u32,
        player_bet: u32,
        player_chips: u32,
        pot: u32,
    },
    GameUpdate {
        hand_id: String,
        pot: u32,
        players: Vec<PlayerUpdate>,
    },
    StreetChange {
        hand_id: String,
        street: Street,
        board: Vec<Card>,
    },
    HandResult {
        hand_id: String,
        winners: Vec<WinnerInfo>,
        board: Vec<Card>,
        showdown: Vec<ShowdownEntry>,
    },
    /// Broadcast to every remaining-connected bot exactly once (spec §4.3,
    /// invariant 3).
    GameCompleted {
        game_id: String,
        hands_completed: u64,
        hand_limit: u64,
        reason: String,
        seed: i64,
        players: Vec<PlayerStatsSnapshot>,
    },
    Error {
        message: String,
    },
}

/// An inbound action, tagged with the server-verified sender's bot id. The
/// `bot_id` is stamped by the read loop from the authenticated connection —
/// never read from the wire payload — and is the sole source of identity
/// for sender verification (spec §3, invariant 2).
#[derive(Clone, Debug)]
pub struct ActionEnvelope {
    pub bot_id: crate::BotId,
    pub action: ActionFrame,
}

/// Outcome of normalizing a client action against engine state (spec §6
/// table). `to_call` is the chips the active seat must add to match the
/// current bet; `stack` is the seat's remaining chips before the action.
pub fn normalize_action(
    client: ClientActionKind,
    amount: u32,
    to_call: u32,
    stack: u32,
) -> (NormalizedAction, ActionLabel) {
    match client {
        ClientActionKind::Fold => (NormalizedAction::Fold, ActionLabel::Fold),
        ClientActionKind::Call if to_call == 0 => (NormalizedAction::Check, ActionLabel::Check),
        ClientActionKind::Call => (NormalizedAction::Call, ActionLabel::Call),
        ClientActionKind::Raise if amount >= stack => {
            (NormalizedAction::AllIn, ActionLabel::AllIn)
        }
        ClientActionKind::Raise => (NormalizedAction::Raise(amount), ActionLabel::Raise),
        ClientActionKind::AllIn => (NormalizedAction::AllIn, ActionLabel::AllIn),
    }
}

/// The engine-facing action vocabulary (spec §6: `{fold, check, call, raise,
/// allin}`), one member wider than the four client verbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NormalizedAction {
    Fold,
    Check,
    Call,
    Raise(u32),
    AllIn,
}
