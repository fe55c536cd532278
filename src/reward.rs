//! Reward calculation
//!
//! Pure and deterministic so payouts stay auditable: the same outcome
//! always yields the same number of units.

use crate::level::{ActivityKind, Difficulty};

/// `base + difficulty bonus + score / divisor` (integer division)
pub fn reward(base_units: u32, difficulty_bonus: u32, score: u32, divisor: u32) -> u32 {
    base_units + difficulty_bonus + score / divisor
}

/// Flat units awarded regardless of score
pub fn base_units(activity: ActivityKind) -> u32 {
    match activity {
        ActivityKind::FallingCatch | ActivityKind::TileReflex | ActivityKind::SequenceRecall => 5,
        ActivityKind::OrbitRelease | ActivityKind::PegDrop | ActivityKind::SignalSplit => 0,
    }
}

/// Extra units for playing a harder tier
pub fn difficulty_bonus(activity: ActivityKind, difficulty: Difficulty) -> u32 {
    match activity {
        ActivityKind::FallingCatch | ActivityKind::TileReflex | ActivityKind::SequenceRecall => {
            match difficulty {
                Difficulty::Low => 0,
                Difficulty::Medium => 5,
                Difficulty::High => 10,
            }
        }
        ActivityKind::OrbitRelease | ActivityKind::PegDrop | ActivityKind::SignalSplit => 0,
    }
}

/// Score points per reward unit
pub fn divisor(activity: ActivityKind) -> u32 {
    match activity {
        ActivityKind::FallingCatch | ActivityKind::TileReflex | ActivityKind::SequenceRecall => 50,
        ActivityKind::OrbitRelease | ActivityKind::PegDrop => 20,
        ActivityKind::SignalSplit => 25,
    }
}

/// Units earned for a finished session of `activity` at `difficulty`
pub fn reward_for(activity: ActivityKind, difficulty: Difficulty, score: u32) -> u32 {
    reward(
        base_units(activity),
        difficulty_bonus(activity, difficulty),
        score,
        divisor(activity),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reward_formula() {
        assert_eq!(reward(5, 10, 120, 40), 18);
        assert_eq!(reward(0, 0, 99, 25), 3);
        assert_eq!(reward(0, 0, 0, 20), 0);
    }

    #[test]
    fn test_reward_deterministic() {
        let a = reward(5, 5, 120, 40);
        let b = reward(5, 5, 120, 40);
        assert_eq!(a, b);
    }

    #[test]
    fn test_reward_for_uses_activity_constants() {
        // Score-chasing game: 5 base + 10 high bonus + 250/50
        assert_eq!(
            reward_for(ActivityKind::FallingCatch, Difficulty::High, 250),
            20
        );
        // Accrual game: no base, score/25
        assert_eq!(reward_for(ActivityKind::SignalSplit, Difficulty::High, 250), 10);
        assert_eq!(reward_for(ActivityKind::PegDrop, Difficulty::Low, 200), 10);
    }

    proptest! {
        #[test]
        fn prop_reward_monotonic_in_score(score in 0u32..100_000, bump in 0u32..1_000) {
            for activity in ActivityKind::ALL {
                let lo = reward_for(activity, Difficulty::Medium, score);
                let hi = reward_for(activity, Difficulty::Medium, score + bump);
                prop_assert!(hi >= lo);
            }
        }
    }
}
