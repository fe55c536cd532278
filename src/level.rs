//! Level identity types: which game, which tier, which level index.
//!
//! `LevelSpec` is the key every completion record is stored under.

use serde::{Deserialize, Serialize};

use crate::GameError;

/// One of the six mini-game variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    /// Catch falling lines inside a per-lane hit window
    FallingCatch,
    /// Release all orbiters while they pass a target arc
    OrbitRelease,
    /// Tap shuffling target tiles against the clock
    TileReflex,
    /// Watch a node sequence, then reproduce it in order
    SequenceRecall,
    /// Drop a ball through a peg field into scored targets
    PegDrop,
    /// Split travelling signals inside their zone
    SignalSplit,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 6] = [
        ActivityKind::FallingCatch,
        ActivityKind::OrbitRelease,
        ActivityKind::TileReflex,
        ActivityKind::SequenceRecall,
        ActivityKind::PegDrop,
        ActivityKind::SignalSplit,
    ];

    /// Number of levels this activity ships with
    pub fn level_count(&self) -> u8 {
        match self {
            ActivityKind::FallingCatch | ActivityKind::TileReflex | ActivityKind::SequenceRecall => {
                10
            }
            ActivityKind::OrbitRelease | ActivityKind::PegDrop | ActivityKind::SignalSplit => 8,
        }
    }

    /// Currency this activity pays out in
    pub fn currency(&self) -> CurrencyKind {
        match self {
            ActivityKind::FallingCatch => CurrencyKind::EchoFragments,
            ActivityKind::OrbitRelease => CurrencyKind::StabilityPoints,
            ActivityKind::TileReflex => CurrencyKind::PathwayShards,
            ActivityKind::SequenceRecall => CurrencyKind::ReflectionSparks,
            ActivityKind::PegDrop => CurrencyKind::PatternFragments,
            ActivityKind::SignalSplit => CurrencyKind::EnergyMarks,
        }
    }

    /// How a repeat completion of the same level is merged into the store
    pub fn repeat_policy(&self) -> RepeatPolicy {
        match self {
            // Reward-accrual games: latest run replaces the record.
            ActivityKind::OrbitRelease | ActivityKind::PegDrop | ActivityKind::SignalSplit => {
                RepeatPolicy::Overwrite
            }
            // Score-chasing games: only a better run replaces the record.
            ActivityKind::FallingCatch | ActivityKind::TileReflex | ActivityKind::SequenceRecall => {
                RepeatPolicy::BestScore
            }
        }
    }
}

/// Per-activity reward counters, persisted in aggregate statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CurrencyKind {
    EchoFragments,
    StabilityPoints,
    PathwayShards,
    ReflectionSparks,
    PatternFragments,
    EnergyMarks,
}

/// Merge rule applied when a completed level is completed again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatPolicy {
    /// Always replace the stored record (currency still only awarded once)
    Overwrite,
    /// Replace only when the new score beats the stored best
    BestScore,
}

/// Difficulty tier, scaling simulation speed and payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Low,
    Medium,
    High,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Low, Difficulty::Medium, Difficulty::High];

    /// Scales entity speed, spawn cadence and display cadence
    pub fn speed_multiplier(&self) -> f32 {
        match self {
            Difficulty::Low => 1.0,
            Difficulty::Medium => 1.4,
            Difficulty::High => 1.8,
        }
    }

    /// Scales point values, target thresholds and payout
    pub fn reward_multiplier(&self) -> u32 {
        match self {
            Difficulty::Low => 1,
            Difficulty::Medium => 2,
            Difficulty::High => 3,
        }
    }
}

/// Identity of one playable level: (activity, level index, difficulty)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LevelSpec {
    pub activity: ActivityKind,
    pub level: u8,
    pub difficulty: Difficulty,
}

impl LevelSpec {
    /// Build a spec, failing fast on an out-of-range level index.
    /// An invalid index is a caller bug, not a recoverable condition.
    pub fn new(activity: ActivityKind, level: u8, difficulty: Difficulty) -> Result<Self, GameError> {
        let max = activity.level_count();
        if level == 0 || level > max {
            return Err(GameError::InvalidLevel {
                activity,
                level,
                max,
            });
        }
        Ok(Self {
            activity,
            level,
            difficulty,
        })
    }

    /// Level index as 0-based for the `base + level_term` formulas
    pub(crate) fn level0(&self) -> u32 {
        u32::from(self.level) - 1
    }
}

/// Activity highlighted for a given day ordinal (rotates through the list)
pub fn daily_focus(day_ordinal: u32) -> ActivityKind {
    ActivityKind::ALL[day_ordinal as usize % ActivityKind::ALL.len()]
}
