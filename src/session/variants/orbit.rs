//! Orbit-and-release timing game
//!
//! One to three markers orbit a circle in alternating directions. A
//! release attempt succeeds only when every marker sits inside the
//! current target arc; every attempt then starts a fresh round with a
//! new arc position and new marker start angles. Win after enough
//! successful releases, lose when the attempt budget runs out.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use crate::consts::TICK_DT;
use crate::level::LevelSpec;
use crate::normalize_angle;
use crate::session::engine::{VariantPolicy, Verdict};
use crate::session::state::{EntityView, HitTier, InputEvent, SessionCore, SessionEvent};

/// Fraction of the arc half-span inside which a marker counts as centered
const PERFECT_FRACTION: f32 = 0.3;

#[derive(Debug, Clone)]
struct Orbiter {
    angle: f32,
    /// +1 clockwise, -1 counter-clockwise
    direction: f32,
}

pub struct OrbitRelease {
    /// Radians advanced per fixed tick
    rate_per_tick: f32,
    /// Half the target arc, in radians
    half_span: f32,
    /// Arc midpoint angle, re-rolled after every release attempt
    arc_mid: f32,
    orbiters: Vec<Orbiter>,
    releases: u32,
    target_releases: u32,
    miss_budget: u32,
    successes: u32,
    failures: u32,
}

impl OrbitRelease {
    pub fn new(spec: LevelSpec) -> Self {
        let l = spec.level as u32;
        let m_s = spec.difficulty.speed_multiplier();
        let m_r = spec.difficulty.reward_multiplier();

        let orbiter_count = (1 + l / 3).min(3) as usize;
        let orbiters = (0..orbiter_count)
            .map(|i| Orbiter {
                angle: 0.0,
                direction: if i % 2 == 0 { 1.0 } else { -1.0 },
            })
            .collect();
        let span_fraction = (0.3 - 0.015 * l as f32).max(0.15);

        Self {
            rate_per_tick: (0.02 + 0.003 * l as f32) * m_s,
            half_span: span_fraction * TAU / 2.0,
            arc_mid: 0.0,
            orbiters,
            releases: 0,
            target_releases: 6 + l,
            miss_budget: (6 - m_r).max(3),
            successes: 0,
            failures: 0,
        }
    }

    pub fn successes(&self) -> u32 {
        self.successes
    }

    /// Signed angular distance from the arc midpoint, in (-pi, pi]
    fn offset_from_mid(&self, angle: f32) -> f32 {
        let mut d = normalize_angle(angle - self.arc_mid);
        if d > std::f32::consts::PI {
            d -= TAU;
        }
        d
    }

    fn all_in_arc(&self) -> bool {
        self.orbiters
            .iter()
            .all(|o| self.offset_from_mid(o.angle).abs() <= self.half_span)
    }

    fn all_centered(&self) -> bool {
        let tolerance = self.half_span * PERFECT_FRACTION;
        self.orbiters
            .iter()
            .all(|o| self.offset_from_mid(o.angle).abs() <= tolerance)
    }

    /// Fresh round: new arc position, new orbiter start angles
    fn new_round(&mut self, core: &mut SessionCore) {
        self.arc_mid = core.rng.random_range(0.0..TAU);
        for orbiter in &mut self.orbiters {
            orbiter.angle = core.rng.random_range(0.0..TAU);
        }
    }
}

impl VariantPolicy for OrbitRelease {
    fn begin(&mut self, core: &mut SessionCore) {
        core.max_misses = self.miss_budget;
        self.new_round(core);
    }

    fn spawn_period(&self) -> Option<f32> {
        None
    }

    fn spawn(&mut self, _core: &mut SessionCore) {}

    fn advance(&mut self, _core: &mut SessionCore, dt: f32) {
        let step = self.rate_per_tick * (dt / TICK_DT);
        for orbiter in &mut self.orbiters {
            orbiter.angle = normalize_angle(orbiter.angle + orbiter.direction * step);
        }
    }

    fn handle(&mut self, core: &mut SessionCore, input: &InputEvent) {
        if !matches!(input, InputEvent::Release) {
            return;
        }
        if self.all_in_arc() {
            let (points, tier) = if self.all_centered() {
                (30, HitTier::Perfect)
            } else {
                (15, HitTier::Good)
            };
            let scored = points * core.spec.difficulty.reward_multiplier();
            core.add_score(scored);
            core.push_event(SessionEvent::Hit {
                points: scored,
                tier,
            });
            self.successes += 1;
            self.releases += 1;
        } else {
            core.register_miss();
            self.failures += 1;
        }
        self.new_round(core);
    }

    fn verdict(&self, core: &SessionCore) -> Verdict {
        if self.releases >= self.target_releases {
            Verdict::Won
        } else if core.miss_budget_exhausted() {
            Verdict::Lost
        } else {
            Verdict::Continue
        }
    }

    fn accuracy(&self, _core: &SessionCore) -> Option<f32> {
        let attempts = self.successes + self.failures;
        if attempts == 0 {
            return Some(0.0);
        }
        Some(self.successes as f32 / attempts as f32 * 100.0)
    }

    fn entities(&self) -> Vec<EntityView> {
        self.orbiters
            .iter()
            .enumerate()
            .map(|(i, o)| EntityView {
                lane: i,
                progress: o.angle / TAU,
                pos: Some(Vec2::new(o.angle.cos(), o.angle.sin())),
                consumed: false,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{ActivityKind, Difficulty};

    fn spec(level: u8, difficulty: Difficulty) -> LevelSpec {
        LevelSpec::new(ActivityKind::OrbitRelease, level, difficulty).unwrap()
    }

    fn setup(level: u8, difficulty: Difficulty) -> (OrbitRelease, SessionCore) {
        let spec = spec(level, difficulty);
        let mut game = OrbitRelease::new(spec);
        let mut core = SessionCore::new(spec, 42);
        game.begin(&mut core);
        (game, core)
    }

    #[test]
    fn test_orbiter_count_grows_with_level() {
        let (g1, _) = setup(1, Difficulty::Low);
        assert_eq!(g1.orbiters.len(), 1);
        let (g3, _) = setup(3, Difficulty::Low);
        assert_eq!(g3.orbiters.len(), 2);
        let (g8, _) = setup(8, Difficulty::Low);
        assert_eq!(g8.orbiters.len(), 3);
        // Adjacent orbiters run opposite ways
        assert_ne!(g8.orbiters[0].direction, g8.orbiters[1].direction);
    }

    #[test]
    fn test_budget_shrinks_with_difficulty() {
        let (low, _) = setup(1, Difficulty::Low);
        assert_eq!(low.miss_budget, 5);
        let (high, _) = setup(1, Difficulty::High);
        assert_eq!(high.miss_budget, 3);
    }

    #[test]
    fn test_release_inside_arc_scores() {
        let (mut game, mut core) = setup(1, Difficulty::Low);
        // Park the single orbiter dead on the arc midpoint
        let mid = game.arc_mid;
        game.orbiters[0].angle = mid;
        game.handle(&mut core, &InputEvent::Release);
        assert_eq!(game.successes, 1);
        assert_eq!(core.score, 30);
        assert_eq!(core.misses, 0);
        // The arc moved for the next round
        assert!(core
            .drain_events()
            .iter()
            .any(|e| matches!(e, SessionEvent::Hit { points: 30, .. })));
    }

    #[test]
    fn test_release_near_edge_scores_half() {
        let (mut game, mut core) = setup(1, Difficulty::Low);
        let mid = game.arc_mid;
        // Inside the arc but outside the centered tolerance
        game.orbiters[0].angle = normalize_angle(mid + game.half_span * 0.9);
        game.handle(&mut core, &InputEvent::Release);
        assert_eq!(core.score, 15);
    }

    #[test]
    fn test_release_outside_arc_is_one_miss() {
        let spec = spec(8, Difficulty::Low);
        let mut game = OrbitRelease::new(spec);
        let mut core = SessionCore::new(spec, 42);
        game.begin(&mut core);

        // All three in the arc except one: the attempt fails as a whole
        let mid = game.arc_mid;
        game.orbiters[0].angle = mid;
        game.orbiters[1].angle = mid;
        game.orbiters[2].angle = normalize_angle(mid + std::f32::consts::PI);
        game.handle(&mut core, &InputEvent::Release);
        assert_eq!(core.misses, 1);
        assert_eq!(core.score, 0);
        assert_eq!(game.failures, 1);
    }

    #[test]
    fn test_win_after_target_releases() {
        let (mut game, mut core) = setup(1, Difficulty::Low);
        assert_eq!(game.target_releases, 7);
        for _ in 0..7 {
            game.orbiters[0].angle = game.arc_mid;
            game.handle(&mut core, &InputEvent::Release);
        }
        assert_eq!(game.verdict(&core), Verdict::Won);
    }

    #[test]
    fn test_accuracy_is_success_rate() {
        let (mut game, mut core) = setup(1, Difficulty::Low);
        game.orbiters[0].angle = game.arc_mid;
        game.handle(&mut core, &InputEvent::Release);
        game.orbiters[0].angle = normalize_angle(game.arc_mid + std::f32::consts::PI);
        game.handle(&mut core, &InputEvent::Release);
        assert_eq!(game.accuracy(&core), Some(50.0));
    }

    #[test]
    fn test_orbiters_advance_with_time() {
        let (mut game, mut core) = setup(1, Difficulty::Low);
        game.orbiters[0].angle = 1.0;
        game.advance(&mut core, TICK_DT);
        let after = game.orbiters[0].angle;
        assert!((after - 1.0 - game.rate_per_tick).abs() < 1e-5);
    }
}
