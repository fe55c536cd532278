//! Signal-splitting lane game
//!
//! Signals travel left to right, each bound to one split zone near the
//! right edge. Tapping a zone splits its signal only while the signal is
//! inside the zone band, paying more the closer it sits to the zone
//! center. A signal drifting past the edge unsplit is a miss. Win after
//! enough splits, lose when the miss budget is gone.

use glam::Vec2;
use rand::Rng;

use crate::consts::TICK_DT;
use crate::level::LevelSpec;
use crate::session::engine::{VariantPolicy, Verdict};
use crate::session::state::{EntityView, HitTier, InputEvent, SessionCore, SessionEvent};

/// Zone band center and half-width on the x axis
const ZONE_X: f32 = 0.85;
const ZONE_HALF_WIDTH: f32 = 0.06;
/// A signal past this x unsplit is gone
const EDGE_X: f32 = 0.98;
const BASE_POINTS: u32 = 15;

#[derive(Debug, Clone, Copy)]
struct Signal {
    zone: usize,
    x: f32,
}

pub struct SignalSplit {
    zone_count: usize,
    /// Horizontal travel per fixed tick
    speed_per_tick: f32,
    spawn_secs: f32,
    reward_mult: u32,
    target_splits: u32,
    miss_budget: u32,
    signals: Vec<Signal>,
    splits: u32,
    escaped: u32,
}

impl SignalSplit {
    pub fn new(spec: LevelSpec) -> Self {
        let l = u32::from(spec.level);
        let m_s = spec.difficulty.speed_multiplier();
        let m_r = spec.difficulty.reward_multiplier();

        Self {
            zone_count: ((2 + l / 3) as usize).min(4),
            speed_per_tick: 0.003 * m_s + 0.0003 * l as f32,
            spawn_secs: (2.0 - 0.12 * l as f32).max(0.8) / m_s,
            reward_mult: m_r,
            target_splits: 8 + 2 * l,
            miss_budget: (6 - m_r).max(3),
            signals: Vec::new(),
            splits: 0,
            escaped: 0,
        }
    }

    pub fn zone_count(&self) -> usize {
        self.zone_count
    }

    pub fn splits(&self) -> u32 {
        self.splits
    }

    /// Vertical position of a zone row
    fn zone_y(&self, zone: usize) -> f32 {
        (zone + 1) as f32 / (self.zone_count + 1) as f32
    }

    fn timing_bonus(offset: f32) -> (u32, HitTier) {
        if offset < 0.03 {
            (20, HitTier::Perfect)
        } else if offset < 0.06 {
            (10, HitTier::Great)
        } else {
            (0, HitTier::Good)
        }
    }
}

impl VariantPolicy for SignalSplit {
    fn begin(&mut self, core: &mut SessionCore) {
        core.max_misses = self.miss_budget;
    }

    fn spawn_period(&self) -> Option<f32> {
        Some(self.spawn_secs)
    }

    fn spawn(&mut self, core: &mut SessionCore) {
        let zone = core.rng.random_range(0..self.zone_count);
        self.signals.push(Signal { zone, x: 0.0 });
    }

    fn advance(&mut self, core: &mut SessionCore, dt: f32) {
        let step = self.speed_per_tick * (dt / TICK_DT);
        let mut escaped = 0;
        self.signals.retain_mut(|signal| {
            signal.x += step;
            if signal.x > EDGE_X {
                escaped += 1;
                false
            } else {
                true
            }
        });
        for _ in 0..escaped {
            core.register_miss();
            self.escaped += 1;
        }
    }

    fn handle(&mut self, core: &mut SessionCore, input: &InputEvent) {
        let InputEvent::Tap { index: zone } = input else {
            return;
        };
        let target = self
            .signals
            .iter()
            .position(|s| s.zone == *zone && (s.x - ZONE_X).abs() <= ZONE_HALF_WIDTH);
        let Some(index) = target else {
            return;
        };
        let offset = (self.signals[index].x - ZONE_X).abs();
        let (bonus, tier) = Self::timing_bonus(offset);
        let scored = (BASE_POINTS + bonus) * self.reward_mult;
        core.add_score(scored);
        core.push_event(SessionEvent::Hit {
            points: scored,
            tier,
        });
        self.signals.remove(index);
        self.splits += 1;
    }

    fn verdict(&self, core: &SessionCore) -> Verdict {
        if self.splits >= self.target_splits {
            Verdict::Won
        } else if core.miss_budget_exhausted() {
            Verdict::Lost
        } else {
            Verdict::Continue
        }
    }

    fn accuracy(&self, _core: &SessionCore) -> Option<f32> {
        let attempts = self.splits + self.escaped;
        if attempts == 0 {
            return Some(0.0);
        }
        Some(self.splits as f32 / attempts as f32 * 100.0)
    }

    fn entities(&self) -> Vec<EntityView> {
        self.signals
            .iter()
            .map(|signal| EntityView {
                lane: signal.zone,
                progress: signal.x,
                pos: Some(Vec2::new(signal.x, self.zone_y(signal.zone))),
                consumed: false,
            })
            .collect()
    }
}
