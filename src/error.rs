//! Error taxonomy for the concurrency core.
//!
//! Operational boundaries (config loading, CLI parsing) use `anyhow::Result`
//! the way `config.rs` always has; these types are for the errors that cross
//! an actor boundary and must be matched on, not just logged.

use std::fmt;

/// Why `HandEngine::apply_action` refused an action. Caught by `HandRunner`,
/// which forces a fold instead of propagating the error (spec §7, "Invalid
/// client action").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandError {
    InvalidAction,
    DeckExhausted,
    NoActiveSeat,
}

impl fmt::Display for HandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandError::InvalidAction => write!(f, "invalid action for current game state"),
            HandError::DeckExhausted => write!(f, "deck exhausted while dealing"),
            HandError::NoActiveSeat => write!(f, "no active seat"),
        }
    }
}

impl std::error::Error for HandError {}

/// Returned by `Bot::send` when the outbound queue is full. Never propagated
/// past the caller: it is a signal to force-fold (if seated) or disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackpressureError;

impl fmt::Display for BackpressureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bot send queue is full")
    }
}

impl std::error::Error for BackpressureError {}

/// Returned by `BotPool` construction when configuration is internally
/// inconsistent. The only error surface that can legitimately abort startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    MinExceedsMax { min: usize, max: usize },
    MinPlayersZero,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::MinExceedsMax { min, max } => {
                write!(f, "min_players ({min}) exceeds max_players ({max})")
            }
            PoolError::MinPlayersZero => write!(f, "min_players must be at least 1"),
        }
    }
}

impl std::error::Error for PoolError {}
