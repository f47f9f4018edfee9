//! Server configuration, persisted as TOML the way the teacher's own
//! `config::Config` loads and saves its settings file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Depth of per-hand statistics tracked by the `StatsCollector` (spec §4.5).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatsDepth {
    Basic,
    Detailed,
    Full,
}

/// Every field enumerated in spec §6's configuration table, plus the buffer
/// sizing knobs the core's channels need to compile.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub small_blind: u32,
    pub big_blind: u32,
    pub start_chips: u32,
    pub timeout_ms: u64,
    pub min_players: usize,
    pub max_players: usize,
    pub require_player: bool,
    /// 0 = unlimited.
    pub hand_limit: u64,
    pub seed: i64,
    pub enable_stats: bool,
    pub stats_depth: StatsDepth,
    pub max_stats_hands: usize,
    pub infinite_bankroll: bool,

    /// Capacity of each per-bot outbound queue and of the pool's internal
    /// event channels.
    pub channel_buffer_size: usize,
    /// `available` queue capacity is `max_players * available_capacity_factor`
    /// (spec §3: "capacity ≥ max table size × constant").
    pub available_capacity_factor: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            small_blind: 5,
            big_blind: 10,
            start_chips: 1000,
            timeout_ms: 100,
            min_players: 2,
            max_players: 6,
            require_player: false,
            hand_limit: 0,
            seed: 0,
            enable_stats: true,
            stats_depth: StatsDepth::Detailed,
            max_stats_hands: 10_000,
            infinite_bankroll: false,
            channel_buffer_size: 64,
            available_capacity_factor: 4,
        }
    }
}

impl Config {
    /// Load configuration from `path`. If the file does not exist, create it
    /// with reasonable defaults and return the default config.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)
                .with_context(|| format!("reading config file '{}'", path.display()))?;
            let cfg: Config = toml::from_str(&s)
                .with_context(|| format!("parsing TOML config '{}'", path.display()))?;
            Ok(cfg)
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("creating config directory '{}'", parent.display())
                    })?;
                }
            }

            let cfg = Config::default();
            let toml_text = toml::to_string_pretty(&cfg)
                .with_context(|| "serializing default config to TOML")?;
            fs::write(path, toml_text)
                .with_context(|| format!("writing default config to '{}'", path.display()))?;
            Ok(cfg)
        }
    }

    /// Save the current config state back to the provided path (overwrites).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating config directory '{}'", parent.display()))?;
            }
        }
        let toml_text =
            toml::to_string_pretty(&self).with_context(|| "serializing config to TOML")?;
        fs::write(path, toml_text)
            .with_context(|| format!("writing config to '{}'", path.display()))?;
        Ok(())
    }

    /// Load (or create) config and apply CLI overrides in-memory, persisting
    /// only when `persist` is true.
    pub fn load_or_create_with_overrides(
        path: &Path,
        bots: Option<usize>,
        hand_limit: Option<u64>,
        persist: bool,
    ) -> Result<Self> {
        let mut cfg = Self::load_or_create(path)?;
        let mut changed = false;
        if let Some(b) = bots {
            cfg.max_players = b.max(cfg.min_players);
            changed = true;
        }
        if let Some(hl) = hand_limit {
            cfg.hand_limit = hl;
            changed = true;
        }
        if changed && persist {
            cfg.save(path)?;
        }
        Ok(cfg)
    }

    pub fn available_capacity(&self) -> usize {
        self.max_players * self.available_capacity_factor
    }
}
