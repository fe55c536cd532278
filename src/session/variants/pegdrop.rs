//! Peg-board drop game
//!
//! The player chooses a horizontal drop point; the ball falls through
//! staggered peg rows, deflecting off every peg it grazes, and lands in
//! one of the scored targets along the bottom. Bonus pegs pay a small
//! flat amount on contact. Five drops per session; landing at least
//! three in a target wins.
//!
//! All coordinates are normalized to a unit board, x to the right and y
//! downwards.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::Rng;

use crate::consts::TICK_DT;
use crate::level::LevelSpec;
use crate::session::engine::{VariantPolicy, Verdict};
use crate::session::state::{EntityView, HitTier, InputEvent, SessionCore, SessionEvent};

const TOTAL_DROPS: u32 = 5;
const DROPS_TO_WIN: u32 = 3;
const DROP_MIN_X: f32 = 0.1;
const DROP_MAX_X: f32 = 0.9;
const WALL_LEFT: f32 = 0.05;
const WALL_RIGHT: f32 = 0.95;
const WALL_RESTITUTION: f32 = -0.7;
const PEG_RADIUS: f32 = 0.04;
const TARGET_Y: f32 = 0.88;
const BONUS_POINTS: u32 = 10;
/// Per-tick velocity deltas
const GRAVITY: f32 = 0.0004;
const JITTER: f32 = 0.0008;

#[derive(Debug, Clone, Copy)]
struct Peg {
    pos: Vec2,
    bonus: bool,
}

#[derive(Debug, Clone)]
struct Ball {
    pos: Vec2,
    vel: Vec2,
    /// Bonus pegs already paid out during this flight
    paid_pegs: BTreeSet<usize>,
}

pub struct PegDrop {
    speed_mult: f32,
    reward_mult: u32,
    /// Bonus pegs only appear from level 3
    with_bonus_pegs: bool,
    row_count: usize,
    pegs: Vec<Peg>,
    /// Point value per target slot, left to right
    target_points: Vec<u32>,
    target_width: f32,
    ball: Option<Ball>,
    drops_used: u32,
    drops_scored: u32,
}

impl PegDrop {
    pub fn new(spec: LevelSpec) -> Self {
        let l = u32::from(spec.level);
        let target_count = ((3 + l / 3) as usize).min(6);
        let target_points = (0..target_count)
            .map(|i| {
                if i == target_count / 2 {
                    100
                } else if i == 0 || i == target_count - 1 {
                    20
                } else {
                    50
                }
            })
            .collect();
        Self {
            speed_mult: spec.difficulty.speed_multiplier(),
            reward_mult: spec.difficulty.reward_multiplier(),
            with_bonus_pegs: spec.level >= 3,
            row_count: ((4 + l) as usize).min(8),
            pegs: Vec::new(),
            target_points,
            target_width: 0.8 / target_count as f32,
            ball: None,
            drops_used: 0,
            drops_scored: 0,
        }
    }

    pub fn drops_left(&self) -> u32 {
        TOTAL_DROPS - self.drops_used
    }

    pub fn drops_scored(&self) -> u32 {
        self.drops_scored
    }

    /// Staggered peg field: rows alternate five and four pegs, odd rows
    /// offset half a gap.
    fn build_pegs(&mut self, core: &mut SessionCore) {
        self.pegs.clear();
        for row in 0..self.row_count {
            let (count, offset) = if row % 2 == 0 { (5, 0.0) } else { (4, 0.1) };
            for col in 0..count {
                let x = offset + (col + 1) as f32 / (count + 1) as f32;
                let y = 0.15 + row as f32 * 0.08;
                let bonus =
                    self.with_bonus_pegs && col == count / 2 && core.rng.random_bool(0.5);
                self.pegs.push(Peg {
                    pos: Vec2::new(x, y),
                    bonus,
                });
            }
        }
    }

    /// Which target slot contains `x`, if any
    fn target_at(&self, x: f32) -> Option<usize> {
        if !(DROP_MIN_X..=DROP_MAX_X).contains(&x) {
            return None;
        }
        let index = ((x - DROP_MIN_X) / self.target_width) as usize;
        Some(index.min(self.target_points.len() - 1))
    }

    fn resolve_landing(&mut self, core: &mut SessionCore, x: f32) {
        match self.target_at(x) {
            Some(index) => {
                let scored = self.target_points[index] * self.reward_mult;
                core.add_score(scored);
                core.push_event(SessionEvent::Hit {
                    points: scored,
                    tier: HitTier::Good,
                });
                self.drops_scored += 1;
            }
            None => core.register_miss(),
        }
    }
}

impl VariantPolicy for PegDrop {
    fn begin(&mut self, core: &mut SessionCore) {
        // Fixed number of drops; misses are not the loss condition
        core.max_misses = u32::MAX;
        self.build_pegs(core);
    }

    fn advance(&mut self, core: &mut SessionCore, dt: f32) {
        let Some(mut ball) = self.ball.take() else {
            return;
        };
        let scale = dt / TICK_DT;

        ball.vel.y += GRAVITY * self.speed_mult * scale;
        ball.vel.x += core.rng.random_range(-JITTER..=JITTER) * scale;
        ball.pos += ball.vel * scale;

        if ball.pos.x < WALL_LEFT {
            ball.pos.x = WALL_LEFT;
            ball.vel.x *= WALL_RESTITUTION;
        } else if ball.pos.x > WALL_RIGHT {
            ball.pos.x = WALL_RIGHT;
            ball.vel.x *= WALL_RESTITUTION;
        }

        for (index, peg) in self.pegs.iter().enumerate() {
            if ball.pos.distance(peg.pos) >= PEG_RADIUS {
                continue;
            }
            // Kick sideways away from the peg and bleed fall speed
            let away = if ball.pos.x >= peg.pos.x { 0.005 } else { -0.005 };
            ball.vel.x = core.rng.random_range(-0.01..=0.01) + away;
            ball.vel.y *= 0.5;
            if peg.bonus && ball.paid_pegs.insert(index) {
                core.add_score(BONUS_POINTS);
                core.push_event(SessionEvent::BonusContact);
            }
        }

        if ball.pos.y >= TARGET_Y {
            self.resolve_landing(core, ball.pos.x);
        } else {
            self.ball = Some(ball);
        }
    }

    fn handle(&mut self, _core: &mut SessionCore, input: &InputEvent) {
        let InputEvent::Drop { x } = input else {
            return;
        };
        // One ball in flight at a time
        if self.ball.is_some() || self.drops_used >= TOTAL_DROPS {
            return;
        }
        self.drops_used += 1;
        self.ball = Some(Ball {
            pos: Vec2::new(x.clamp(DROP_MIN_X, DROP_MAX_X), 0.05),
            vel: Vec2::ZERO,
            paid_pegs: BTreeSet::new(),
        });
    }

    fn verdict(&self, _core: &SessionCore) -> Verdict {
        if self.drops_used < TOTAL_DROPS || self.ball.is_some() {
            Verdict::Continue
        } else if self.drops_scored >= DROPS_TO_WIN {
            Verdict::Won
        } else {
            Verdict::Lost
        }
    }

    fn accuracy(&self, _core: &SessionCore) -> Option<f32> {
        Some(self.drops_scored as f32 / TOTAL_DROPS as f32 * 100.0)
    }

    fn entities(&self) -> Vec<EntityView> {
        let mut views: Vec<EntityView> = self
            .pegs
            .iter()
            .map(|peg| EntityView {
                lane: 0,
                progress: if peg.bonus { 1.0 } else { 0.0 },
                pos: Some(peg.pos),
                consumed: false,
            })
            .collect();
        if let Some(ball) = &self.ball {
            views.push(EntityView {
                lane: 1,
                progress: ball.pos.y,
                pos: Some(ball.pos),
                consumed: false,
            });
        }
        views
    }
}
