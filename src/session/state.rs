//! Session state types shared by the engine and all variant policies

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::level::LevelSpec;

/// Lifecycle of one play-through
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// Pre-game countdown, decremented once per second
    Countdown { remaining: u32 },
    /// Gameplay; ticks and inputs are processed
    Active,
    /// Terminal; all timers are cancelled, nothing is processed anymore
    Ended(Outcome),
}

/// Terminal result of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub score: u32,
    /// Hit accuracy percentage, for variants that track hits against misses
    pub accuracy: Option<f32>,
    /// Wall time in seconds from entering `Active` to the terminal condition
    pub time_spent: f32,
}

/// Player input forwarded by the UI layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Tap on a lane, tile, node or zone
    Tap { index: usize },
    /// Release all orbiters (orbit-release variant)
    Release,
    /// Drop a ball at a normalized horizontal position (peg-drop variant)
    Drop { x: f32 },
}

/// Hit quality tier, mapped to point values by each variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTier {
    Perfect,
    Great,
    Good,
}

/// Feedback events drained by the UI between frames
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    CountdownTicked { remaining: u32 },
    Started,
    Hit { points: u32, tier: HitTier },
    Miss,
    /// Decoy tap or similar: points and seconds taken away
    Penalty { points: u32, seconds: f32 },
    /// A full target set was cleared (tile variant)
    SetCleared,
    /// Sequence display lit up a node (recall variant)
    NodeShown { node: usize },
    RoundAdvanced { round: u32 },
    BonusContact,
    Ended { success: bool },
}

/// Read-only view of one live entity for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityView {
    /// Lane / zone / node index, 0 where the variant has no lanes
    pub lane: usize,
    /// Progress scalar: fall progress, angle in radians, or x position
    pub progress: f32,
    /// 2D position for variants that simulate one (peg-drop ball)
    pub pos: Option<Vec2>,
    /// Already hit / split / consumed
    pub consumed: bool,
}

/// Generic per-session state every variant mutates through its policy
pub struct SessionCore {
    pub spec: LevelSpec,
    pub score: u32,
    pub misses: u32,
    /// Miss budget; exhausting it is a variant's loss condition
    pub max_misses: u32,
    /// Seconds spent in `Active`
    pub elapsed_active: f32,
    /// Per-session deterministic RNG; all variant randomness goes through it
    pub rng: Pcg32,
    events: Vec<SessionEvent>,
}

impl SessionCore {
    pub fn new(spec: LevelSpec, seed: u64) -> Self {
        Self {
            spec,
            score: 0,
            misses: 0,
            max_misses: 0,
            elapsed_active: 0.0,
            rng: Pcg32::seed_from_u64(seed),
            events: Vec::new(),
        }
    }

    pub fn push_event(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    /// Move accumulated feedback events out to the caller
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn add_score(&mut self, points: u32) {
        self.score += points;
    }

    /// Score penalty, floored at zero
    pub fn penalize_score(&mut self, points: u32) {
        self.score = self.score.saturating_sub(points);
    }

    /// Count a miss and emit the event
    pub fn register_miss(&mut self) {
        self.misses += 1;
        self.events.push(SessionEvent::Miss);
    }

    pub fn miss_budget_exhausted(&self) -> bool {
        self.misses >= self.max_misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{ActivityKind, Difficulty, LevelSpec};

    fn core() -> SessionCore {
        let spec = LevelSpec::new(ActivityKind::FallingCatch, 1, Difficulty::Low).unwrap();
        SessionCore::new(spec, 7)
    }

    #[test]
    fn test_penalty_floors_at_zero() {
        let mut core = core();
        core.add_score(3);
        core.penalize_score(5);
        assert_eq!(core.score, 0);
    }

    #[test]
    fn test_miss_budget() {
        let mut core = core();
        core.max_misses = 2;
        assert!(!core.miss_budget_exhausted());
        core.register_miss();
        core.register_miss();
        assert!(core.miss_budget_exhausted());
        assert_eq!(core.drain_events(), vec![SessionEvent::Miss, SessionEvent::Miss]);
        assert!(core.drain_events().is_empty());
    }

    #[test]
    fn test_rng_reproducible_from_seed() {
        use rand::Rng;
        let mut a = core();
        let mut b = core();
        let xs: Vec<u32> = (0..8).map(|_| a.rng.random_range(0..100)).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.rng.random_range(0..100)).collect();
        assert_eq!(xs, ys);
    }
}
