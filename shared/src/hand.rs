//! Hand evaluation types shared between the concurrency core and its
//! `HandEngine` collaborators.

use serde::{Deserialize, Serialize};

use crate::cards::Card;

/// Categories of poker hands, ordered from weakest to strongest.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandRankCategory {
    HighCard,
    Pair,
    TwoPair,
    ThreeKind,
    Straight,
    Flush,
    FullHouse,
    FourKind,
    StraightFlush,
}

/// Complete hand ranking including category and tiebreakers, ordered so that
/// `a.cmp(&b) == Greater` means `a` beats `b`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct HandRank {
    pub category: HandRankCategory,
    pub tiebreakers: Vec<u8>,
}

/// Result of evaluating one seat's hand at showdown.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandResult {
    pub seat: usize,
    pub rank: HandRank,
    pub best_five: [Card; 5],
}
