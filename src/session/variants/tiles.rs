//! Shuffling-tile reaction game
//!
//! A square grid holds a set of target tiles, shuffled to new positions on
//! a cadence. Tapping every target clears the set, banks a bonus and deals
//! a fresh board. From level 4, decoy tiles appear; tapping one costs
//! points and time but leaves set progress alone. The round runs on a
//! fixed time budget and succeeds if at least one set was cleared.

use std::collections::BTreeSet;

use rand::Rng;

use crate::level::LevelSpec;
use crate::session::engine::{VariantPolicy, Verdict};
use crate::session::state::{EntityView, HitTier, InputEvent, SessionCore, SessionEvent};

const TARGET_POINTS: u32 = 10;
const SET_BONUS: u32 = 20;
const DECOY_POINT_PENALTY: u32 = 5;
const DECOY_TIME_PENALTY: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileRole {
    Blank,
    Target { tapped: bool },
    Decoy,
}

pub struct TileReflex {
    side: usize,
    shuffle_secs: f32,
    targets_per_set: usize,
    /// Decoys join the board from level 4
    with_decoys: bool,
    reward_mult: u32,
    time_left: f32,
    cells: Vec<TileRole>,
    sets_cleared: u32,
}

impl TileReflex {
    pub fn new(spec: LevelSpec) -> Self {
        let l = spec.level0();
        let m_s = spec.difficulty.speed_multiplier();
        let m_r = spec.difficulty.reward_multiplier();

        let side = match spec.level {
            ..=3 => 3,
            ..=6 => 4,
            _ => 5,
        };
        Self {
            side,
            shuffle_secs: (2.5 - l as f32 * 0.19).max(0.8) / m_s,
            targets_per_set: ((2 + l / 2 + (m_r - 1)) as usize).min(8),
            with_decoys: spec.level >= 4,
            reward_mult: m_r,
            time_left: 30.0 + l as f32 * 1.5,
            cells: Vec::new(),
            sets_cleared: 0,
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn time_left(&self) -> f32 {
        self.time_left
    }

    pub fn sets_cleared(&self) -> u32 {
        self.sets_cleared
    }

    fn cell_count(&self) -> usize {
        self.side * self.side
    }

    /// Deal a fresh board: fresh target positions, fresh decoys
    fn regenerate(&mut self, core: &mut SessionCore) {
        let count = self.cell_count();
        self.cells = vec![TileRole::Blank; count];

        let mut targets = BTreeSet::new();
        while targets.len() < self.targets_per_set.min(count) {
            targets.insert(core.rng.random_range(0..count));
        }
        for &index in &targets {
            self.cells[index] = TileRole::Target { tapped: false };
        }
        if self.with_decoys {
            for index in 0..count {
                if index % 4 == 0
                    && self.cells[index] == TileRole::Blank
                    && core.rng.random_bool(0.5)
                {
                    self.cells[index] = TileRole::Decoy;
                }
            }
        }
    }

    /// Move the untapped targets and decoys to new cells; tapped targets
    /// stay where they are so set progress is preserved visually.
    fn shuffle(&mut self, core: &mut SessionCore) {
        let count = self.cell_count();
        let mut roving: Vec<TileRole> = Vec::new();
        for cell in &mut self.cells {
            match *cell {
                TileRole::Target { tapped: false } | TileRole::Decoy => {
                    roving.push(*cell);
                    *cell = TileRole::Blank;
                }
                _ => {}
            }
        }
        for role in roving {
            loop {
                let index = core.rng.random_range(0..count);
                if self.cells[index] == TileRole::Blank {
                    self.cells[index] = role;
                    break;
                }
            }
        }
    }

    fn set_complete(&self) -> bool {
        !self
            .cells
            .iter()
            .any(|cell| *cell == TileRole::Target { tapped: false })
    }
}

impl VariantPolicy for TileReflex {
    fn begin(&mut self, core: &mut SessionCore) {
        // Time-limited game: misses are not the loss condition
        core.max_misses = u32::MAX;
        self.regenerate(core);
    }

    fn spawn_period(&self) -> Option<f32> {
        Some(self.shuffle_secs)
    }

    fn spawn(&mut self, core: &mut SessionCore) {
        self.shuffle(core);
    }

    fn advance(&mut self, _core: &mut SessionCore, dt: f32) {
        self.time_left -= dt;
    }

    fn handle(&mut self, core: &mut SessionCore, input: &InputEvent) {
        let InputEvent::Tap { index } = input else {
            return;
        };
        let Some(cell) = self.cells.get_mut(*index) else {
            return;
        };
        match *cell {
            TileRole::Target { tapped: false } => {
                *cell = TileRole::Target { tapped: true };
                let scored = TARGET_POINTS * self.reward_mult;
                core.add_score(scored);
                core.push_event(SessionEvent::Hit {
                    points: scored,
                    tier: HitTier::Good,
                });
                if self.set_complete() {
                    self.sets_cleared += 1;
                    core.add_score(SET_BONUS);
                    core.push_event(SessionEvent::SetCleared);
                    self.regenerate(core);
                }
            }
            TileRole::Decoy => {
                core.penalize_score(DECOY_POINT_PENALTY);
                self.time_left -= DECOY_TIME_PENALTY;
                core.push_event(SessionEvent::Penalty {
                    points: DECOY_POINT_PENALTY,
                    seconds: DECOY_TIME_PENALTY,
                });
            }
            TileRole::Blank | TileRole::Target { tapped: true } => {}
        }
    }

    fn verdict(&self, _core: &SessionCore) -> Verdict {
        if self.time_left > 0.0 {
            Verdict::Continue
        } else if self.sets_cleared >= 1 {
            Verdict::Won
        } else {
            Verdict::Lost
        }
    }

    fn entities(&self) -> Vec<EntityView> {
        // progress carries the role: 0 target, 1 decoy
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| match *cell {
                TileRole::Blank => None,
                TileRole::Target { tapped } => Some(EntityView {
                    lane: index,
                    progress: 0.0,
                    pos: None,
                    consumed: tapped,
                }),
                TileRole::Decoy => Some(EntityView {
                    lane: index,
                    progress: 1.0,
                    pos: None,
                    consumed: false,
                }),
            })
            .collect()
    }
}
