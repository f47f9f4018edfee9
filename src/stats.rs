//! Pluggable per-hand statistics aggregation (spec §4.5).
//!
//! Two variants behind one trait, exactly the shape DESIGN NOTES (§9)
//! prescribes: a `Null` collector that costs nothing when stats are
//! disabled, and a `Detailed` collector gated by `StatsDepth`.

use std::collections::VecDeque;

use botpoker_shared::{Card, CardRank};

use crate::config::StatsDepth;
use botpoker_shared::{BotId, Role, Street};

/// Canonical hole-card strength bucket.
///
/// The source material contains two inconsistent categorization tables (one
/// placing `AK`/`AQ` in Premium, another moving `AQ` down to Strong). This
/// implementation fixes the first table: `{AA..TT, AK, AQ} → Premium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HoleCategory {
    Premium,
    Strong,
    Medium,
    Weak,
}

impl HoleCategory {
    pub fn name(self) -> &'static str {
        match self {
            HoleCategory::Premium => "premium",
            HoleCategory::Strong => "strong",
            HoleCategory::Medium => "medium",
            HoleCategory::Weak => "weak",
        }
    }
}

fn rank_value(r: CardRank) -> u8 {
    match r {
        CardRank::Ace => 14,
        CardRank::King => 13,
        CardRank::Queen => 12,
        CardRank::Jack => 11,
        CardRank::Ten => 10,
        CardRank::Nine => 9,
        CardRank::Eight => 8,
        CardRank::Seven => 7,
        CardRank::Six => 6,
        CardRank::Five => 5,
        CardRank::Four => 4,
        CardRank::Three => 3,
        CardRank::Two => 2,
    }
}

/// Categorize a starting hand. See `HoleCategory` for the table chosen.
pub fn categorize_hole(hole: [Card; 2]) -> HoleCategory {
    let (mut hi, mut lo) = (rank_value(hole[0].rank()), rank_value(hole[1].rank()));
    if hi < lo {
        std::mem::swap(&mut hi, &mut lo);
    }
    let suited = hole[0].suit() as u8 == hole[1].suit() as u8;
    let paired = hi == lo;
    let connectors = hi.saturating_sub(lo) == 1;
    let broadway = |v: u8| v >= 10;

    if paired && hi >= 10 {
        return HoleCategory::Premium;
    }
    if hi == 14 && (lo == 13 || lo == 12) {
        return HoleCategory::Premium;
    }
    if paired && hi >= 7 {
        return HoleCategory::Strong;
    }
    if hi == 14 && (lo == 11 || lo == 10) {
        return HoleCategory::Strong;
    }
    if hi == 13 && lo == 12 {
        return HoleCategory::Strong;
    }
    if suited && broadway(hi) && broadway(lo) {
        return HoleCategory::Strong;
    }
    if paired {
        return HoleCategory::Medium;
    }
    if suited && connectors {
        return HoleCategory::Medium;
    }
    if hi == 14 && suited {
        return HoleCategory::Medium;
    }
    HoleCategory::Weak
}

/// A seat's position relative to the button, bucketed coarsely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionBucket {
    Button,
    Blinds,
    Early,
    Late,
}

pub fn position_bucket(seat: usize, button: usize, n: usize) -> PositionBucket {
    if n <= 2 {
        return if seat == button {
            PositionBucket::Button
        } else {
            PositionBucket::Blinds
        };
    }
    let offset = (seat + n - button) % n;
    match offset {
        0 => PositionBucket::Button,
        1 | 2 => PositionBucket::Blinds,
        o if o * 2 < n => PositionBucket::Early,
        _ => PositionBucket::Late,
    }
}

/// One seat's outcome in one hand, the unit `StatsCollector::record_hand`
/// consumes.
#[derive(Debug, Clone)]
pub struct HandOutcomeRecord {
    pub hand_id: String,
    pub bot_id: BotId,
    pub role: Role,
    pub seat: usize,
    pub big_blind: u32,
    pub net_chips: i64,
    pub went_to_showdown: bool,
    pub won_at_showdown: bool,
    pub won_hand: bool,
    pub street_reached: Street,
    pub hole_category: Option<HoleCategory>,
    pub position: PositionBucket,
}

#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    pub hands: u64,
    pub wins: u64,
    pub showdowns: u64,
    pub showdown_wins: u64,
    pub net_chips: i64,
    pub bb_sum: f64,
}

impl Accumulator {
    fn add(&mut self, r: &HandOutcomeRecord) {
        self.hands += 1;
        if r.won_hand {
            self.wins += 1;
        }
        if r.went_to_showdown {
            self.showdowns += 1;
            if r.won_at_showdown {
                self.showdown_wins += 1;
            }
        }
        self.net_chips += r.net_chips;
        if r.big_blind > 0 {
            self.bb_sum += r.net_chips as f64 / r.big_blind as f64;
        }
    }

    pub fn bb_per_100(&self) -> f64 {
        if self.hands == 0 {
            0.0
        } else {
            self.bb_sum / self.hands as f64 * 100.0
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.hands == 0 {
            0.0
        } else {
            self.wins as f64 / self.hands as f64
        }
    }

    pub fn showdown_win_rate(&self) -> f64 {
        if self.showdowns == 0 {
            0.0
        } else {
            self.showdown_wins as f64 / self.showdowns as f64
        }
    }
}

/// A read-only view computed on demand from accumulated records.
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub overall: Accumulator,
    pub by_position: Vec<(PositionBucket, Accumulator)>,
    pub by_street: Vec<(Street, Accumulator)>,
    pub by_hole_category: Vec<(HoleCategory, Accumulator)>,
}

/// Interface with two variants (spec §9). No global state: each `BotPool`
/// owns its collector instance.
pub trait StatsCollector: Send + Sync {
    fn is_enabled(&self) -> bool;
    fn record_hand(&mut self, outcomes: &[HandOutcomeRecord]);
    fn summary(&self) -> StatsSummary;
}

/// No-op collector used when `Config::enable_stats` is false.
#[derive(Debug, Default)]
pub struct NullStats;

impl StatsCollector for NullStats {
    fn is_enabled(&self) -> bool {
        false
    }
    fn record_hand(&mut self, _outcomes: &[HandOutcomeRecord]) {}
    fn summary(&self) -> StatsSummary {
        StatsSummary::default()
    }
}

/// Bounded circular buffer of outcome records. On overflow the buffer is
/// reset to empty rather than evicting the oldest entry, per spec §4.5 —
/// this trades history for a guaranteed constant memory ceiling.
pub struct DetailedStats {
    depth: StatsDepth,
    cap: usize,
    records: VecDeque<HandOutcomeRecord>,
}

impl DetailedStats {
    pub fn new(depth: StatsDepth, cap: usize) -> Self {
        Self {
            depth,
            cap: cap.max(1),
            records: VecDeque::new(),
        }
    }
}

impl StatsCollector for DetailedStats {
    fn is_enabled(&self) -> bool {
        true
    }

    fn record_hand(&mut self, outcomes: &[HandOutcomeRecord]) {
        if self.records.len() + outcomes.len() > self.cap {
            self.records.clear();
        }
        self.records.extend(outcomes.iter().cloned());
    }

    fn summary(&self) -> StatsSummary {
        let mut overall = Accumulator::default();
        for r in &self.records {
            overall.add(r);
        }

        let mut by_position = Vec::new();
        let mut by_street = Vec::new();
        let mut by_hole_category = Vec::new();

        if matches!(self.depth, StatsDepth::Detailed | StatsDepth::Full) {
            by_position = bucket_by(&self.records, |r| r.position);
            by_street = bucket_by(&self.records, |r| r.street_reached);
        }
        if matches!(self.depth, StatsDepth::Full) {
            by_hole_category = bucket_by(&self.records, |r| r.hole_category.unwrap_or(HoleCategory::Weak));
        }

        StatsSummary {
            overall,
            by_position,
            by_street,
            by_hole_category,
        }
    }
}

fn bucket_by<K: Ord + Copy>(
    records: &VecDeque<HandOutcomeRecord>,
    key: impl Fn(&HandOutcomeRecord) -> K,
) -> Vec<(K, Accumulator)> {
    let mut map: std::collections::BTreeMap<K, Accumulator> = std::collections::BTreeMap::new();
    for r in records {
        map.entry(key(r)).or_default().add(r);
    }
    map.into_iter().collect()
}
