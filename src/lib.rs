//! Reflex Trails - session engine for a set of timing/reflex mini-games
//!
//! Core modules:
//! - `session`: Deterministic round clock, session state machine, and the
//!   six game variant policies
//! - `progress`: Completion records and aggregate statistics
//! - `storage`: Key-value persistence seam (memory/file backed)
//! - `reward`: Pure reward calculation
//!
//! Rendering, navigation and theming are the embedding app's job; this
//! crate only owns simulation and persistence state.

pub mod level;
pub mod progress;
pub mod reward;
pub mod session;
pub mod storage;

pub use level::{ActivityKind, CurrencyKind, Difficulty, LevelSpec};
pub use progress::{AggregateStatistics, CompletionRecord, ProgressStore};
pub use session::{
    InputEvent, Outcome, Session, SessionEvent, SessionHandle, SessionPhase, start_session,
};

use thiserror::Error;

/// Engine configuration constants
pub mod consts {
    /// Fixed simulation timestep (the variants are tuned against a 16ms
    /// update cadence)
    pub const TICK_DT: f32 = 0.016;
    /// Maximum substeps per `advance` call to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Countdown value every session starts from
    pub const COUNTDOWN_START: u32 = 3;
    /// Seconds per countdown decrement
    pub const COUNTDOWN_STEP_SECS: f32 = 1.0;
}

/// Caller contract violations. Persistence failures never surface as
/// errors; they degrade to defaults.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    /// Level index outside `1..=activity.level_count()`
    #[error("level {level} out of range for {activity:?} (valid 1..={max})")]
    InvalidLevel {
        activity: level::ActivityKind,
        level: u8,
        max: u8,
    },
}

/// Normalize an angle to [0, τ)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::TAU;
    while angle >= TAU {
        angle -= TAU;
    }
    while angle < 0.0 {
        angle += TAU;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle_range() {
        use std::f32::consts::TAU;
        for raw in [-7.0f32, -0.1, 0.0, 1.0, 6.3, 13.0] {
            let n = normalize_angle(raw);
            assert!((0.0..TAU).contains(&n), "{raw} -> {n}");
        }
    }

    #[test]
    fn test_normalize_angle_identity_in_range() {
        assert_eq!(normalize_angle(1.5), 1.5);
    }
}
