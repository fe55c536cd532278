//! Falling-line catcher
//!
//! Lines fall down discrete lanes; a tap scores when a line sits inside
//! the lane's hit window, with tighter timing paying more and feeding a
//! combo. A line falling past the window unhit is a miss and breaks the
//! combo. Win at the target score, lose when the miss budget is gone.

use rand::Rng;

use crate::level::LevelSpec;
use crate::session::engine::{VariantPolicy, Verdict};
use crate::session::state::{EntityView, HitTier, InputEvent, SessionCore, SessionEvent};

/// Hit window over normalized fall progress
const HIT_WINDOW: (f32, f32) = (0.85, 1.05);
/// Progress beyond which an unhit line counts as missed
const MISS_PROGRESS: f32 = 1.1;
/// Window center used for accuracy tiers
const WINDOW_CENTER: f32 = 0.95;

#[derive(Debug, Clone)]
struct FallingLine {
    lane: usize,
    /// 0 at the top, 1 at the hit zone
    progress: f32,
    /// Seconds for the full fall
    fall_secs: f32,
    hit: bool,
}

pub struct FallingCatch {
    lane_count: usize,
    fall_secs: f32,
    spawn_secs: f32,
    /// From level 5, spawned lines vary ±30% in speed
    mixed_speed: bool,
    target_score: u32,
    reward_mult: u32,
    miss_budget: u32,
    lines: Vec<FallingLine>,
    combo: u32,
    max_combo: u32,
}

impl FallingCatch {
    pub fn new(spec: LevelSpec) -> Self {
        let l = spec.level0();
        let m_s = spec.difficulty.speed_multiplier();
        let m_r = spec.difficulty.reward_multiplier();

        let lane_count = match spec.level {
            ..=3 => 3,
            ..=6 => 4,
            _ => 5,
        };
        let difficulty_cut = match m_r {
            1 => 0,
            2 => 2,
            _ => 4,
        };
        Self {
            lane_count,
            fall_secs: (3.0 - l as f32 * 0.17).max(1.5) / m_s,
            spawn_secs: (1.2 - l as f32 * 0.08).max(0.5) / m_s,
            mixed_speed: spec.level >= 5,
            target_score: 300 + l * 55 + (m_r - 1) * 100,
            reward_mult: m_r,
            miss_budget: (10u32.saturating_sub(difficulty_cut + l / 3)).max(4),
            lines: Vec::new(),
            combo: 0,
            max_combo: 0,
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    pub fn target_score(&self) -> u32 {
        self.target_score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    fn tier_points(&self, progress: f32) -> (u32, HitTier) {
        let distance = (progress - WINDOW_CENTER).abs();
        if distance < 0.03 {
            (20 + self.combo * 2, HitTier::Perfect)
        } else if distance < 0.06 {
            (15 + self.combo, HitTier::Great)
        } else {
            (10, HitTier::Good)
        }
    }
}

impl VariantPolicy for FallingCatch {
    fn begin(&mut self, core: &mut SessionCore) {
        core.max_misses = self.miss_budget;
    }

    fn spawn_period(&self) -> Option<f32> {
        Some(self.spawn_secs)
    }

    fn spawn(&mut self, core: &mut SessionCore) {
        let lane = core.rng.random_range(0..self.lane_count);
        let fall_secs = if self.mixed_speed {
            self.fall_secs * core.rng.random_range(0.7..=1.3)
        } else {
            self.fall_secs
        };
        self.lines.push(FallingLine {
            lane,
            progress: 0.0,
            fall_secs,
            hit: false,
        });
    }

    fn advance(&mut self, core: &mut SessionCore, dt: f32) {
        let mut missed = 0;
        for line in &mut self.lines {
            line.progress += dt / line.fall_secs;
            if line.progress > MISS_PROGRESS && !line.hit {
                line.hit = true; // consume so it only counts once
                missed += 1;
            }
        }
        self.lines.retain(|line| line.progress <= MISS_PROGRESS);

        for _ in 0..missed {
            core.register_miss();
            self.combo = 0;
        }
    }

    fn handle(&mut self, core: &mut SessionCore, input: &InputEvent) {
        let InputEvent::Tap { index: lane } = input else {
            return;
        };
        let target = self.lines.iter().position(|line| {
            line.lane == *lane
                && !line.hit
                && line.progress >= HIT_WINDOW.0
                && line.progress <= HIT_WINDOW.1
        });
        if let Some(index) = target {
            let (points, tier) = self.tier_points(self.lines[index].progress);
            let scored = points * self.reward_mult;
            core.add_score(scored);
            core.push_event(SessionEvent::Hit {
                points: scored,
                tier,
            });
            self.lines.remove(index);
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
        }
    }

    fn verdict(&self, core: &SessionCore) -> Verdict {
        if core.score >= self.target_score {
            Verdict::Won
        } else if core.miss_budget_exhausted() {
            Verdict::Lost
        } else {
            Verdict::Continue
        }
    }

    fn entities(&self) -> Vec<EntityView> {
        self.lines
            .iter()
            .map(|line| EntityView {
                lane: line.lane,
                progress: line.progress,
                pos: None,
                consumed: line.hit,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{ActivityKind, Difficulty};

    fn spec(level: u8, difficulty: Difficulty) -> LevelSpec {
        LevelSpec::new(ActivityKind::FallingCatch, level, difficulty).unwrap()
    }

    fn core_for(spec: LevelSpec) -> SessionCore {
        SessionCore::new(spec, 11)
    }

    fn line(lane: usize, progress: f32) -> FallingLine {
        FallingLine {
            lane,
            progress,
            fall_secs: 3.0,
            hit: false,
        }
    }

    #[test]
    fn test_level_one_low_parameters() {
        let game = FallingCatch::new(spec(1, Difficulty::Low));
        assert_eq!(game.target_score, 300);
        assert_eq!(game.miss_budget, 10);
        assert_eq!(game.lane_count, 3);
    }

    #[test]
    fn test_thresholds_tighten_with_level_and_difficulty() {
        let easy = FallingCatch::new(spec(1, Difficulty::Low));
        let late = FallingCatch::new(spec(10, Difficulty::Low));
        assert!(late.target_score > easy.target_score);
        assert!(late.miss_budget < easy.miss_budget);
        assert!(late.fall_secs < easy.fall_secs);

        let hard = FallingCatch::new(spec(1, Difficulty::High));
        assert_eq!(hard.miss_budget, 6);
        assert_eq!(hard.target_score, 300 + 200);

        // Floors hold at the extremes
        let worst = FallingCatch::new(spec(10, Difficulty::High));
        assert_eq!(worst.miss_budget, 4);
    }

    #[test]
    fn test_miss_boundary_is_strictly_above_one_point_one() {
        let spec = spec(1, Difficulty::Low);
        let mut game = FallingCatch::new(spec);
        let mut core = core_for(spec);
        game.begin(&mut core);

        game.lines.push(line(0, 1.10));
        // Zero-length step: nothing moves, 1.10 is still in flight
        game.advance(&mut core, 0.0);
        assert_eq!(core.misses, 0);
        assert_eq!(game.lines.len(), 1);

        game.lines[0].progress = 1.11;
        game.advance(&mut core, 0.0);
        assert_eq!(core.misses, 1);
        assert!(game.lines.is_empty());
    }

    #[test]
    fn test_hit_tiers_and_combo() {
        let spec = spec(1, Difficulty::Low);
        let mut game = FallingCatch::new(spec);
        let mut core = core_for(spec);
        game.begin(&mut core);

        // Perfect hit at window center
        game.lines.push(line(0, 0.95));
        game.handle(&mut core, &InputEvent::Tap { index: 0 });
        assert_eq!(core.score, 20);
        assert_eq!(game.combo, 1);

        // Great hit: combo bonus of 1
        game.lines.push(line(1, 0.91));
        game.handle(&mut core, &InputEvent::Tap { index: 1 });
        assert_eq!(core.score, 20 + 16);
        assert_eq!(game.combo, 2);

        // Good hit at window edge: flat 10
        game.lines.push(line(2, 0.86));
        game.handle(&mut core, &InputEvent::Tap { index: 2 });
        assert_eq!(core.score, 36 + 10);
        assert_eq!(game.max_combo, 3);
    }

    #[test]
    fn test_tap_outside_window_does_nothing() {
        let spec = spec(1, Difficulty::Low);
        let mut game = FallingCatch::new(spec);
        let mut core = core_for(spec);
        game.begin(&mut core);

        game.lines.push(line(0, 0.5));
        game.handle(&mut core, &InputEvent::Tap { index: 0 });
        assert_eq!(core.score, 0);
        assert_eq!(game.combo, 0);
        assert_eq!(game.lines.len(), 1);
    }

    #[test]
    fn test_miss_resets_combo() {
        let spec = spec(1, Difficulty::Low);
        let mut game = FallingCatch::new(spec);
        let mut core = core_for(spec);
        game.begin(&mut core);

        game.lines.push(line(0, 0.95));
        game.handle(&mut core, &InputEvent::Tap { index: 0 });
        assert_eq!(game.combo, 1);

        game.lines.push(line(1, 1.2));
        game.advance(&mut core, 0.0);
        assert_eq!(core.misses, 1);
        assert_eq!(game.combo, 0);
        assert_eq!(game.max_combo, 1);
    }

    #[test]
    fn test_win_at_exact_target_score() {
        let spec = spec(1, Difficulty::Low);
        let mut game = FallingCatch::new(spec);
        let mut core = core_for(spec);
        game.begin(&mut core);

        // 300 points before 10 misses: success
        core.add_score(299);
        assert_eq!(game.verdict(&core), Verdict::Continue);
        core.add_score(1);
        assert_eq!(game.verdict(&core), Verdict::Won);
    }

    #[test]
    fn test_loss_when_budget_exhausted() {
        let spec = spec(1, Difficulty::Low);
        let mut game = FallingCatch::new(spec);
        let mut core = core_for(spec);
        game.begin(&mut core);

        for _ in 0..10 {
            core.register_miss();
        }
        assert_eq!(game.verdict(&core), Verdict::Lost);
    }

    #[test]
    fn test_spawn_uses_session_rng() {
        let spec = spec(5, Difficulty::Low);
        let mut a = FallingCatch::new(spec);
        let mut b = FallingCatch::new(spec);
        let mut core_a = SessionCore::new(spec, 77);
        let mut core_b = SessionCore::new(spec, 77);
        for _ in 0..10 {
            a.spawn(&mut core_a);
            b.spawn(&mut core_b);
        }
        let lanes_a: Vec<usize> = a.lines.iter().map(|l| l.lane).collect();
        let lanes_b: Vec<usize> = b.lines.iter().map(|l| l.lane).collect();
        assert_eq!(lanes_a, lanes_b);
    }
}
