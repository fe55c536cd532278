//! Watch-then-repeat sequence game
//!
//! Each round lights a random node sequence on a cadence, then waits for
//! the player to tap it back in order. A single wrong node ends the
//! session as a loss; reproducing the whole sequence banks points and
//! starts a longer round after a short pause. Reproducing the final
//! round's sequence wins.

use rand::Rng;

use crate::level::LevelSpec;
use crate::session::engine::{VariantPolicy, Verdict};
use crate::session::state::{EntityView, HitTier, InputEvent, SessionCore, SessionEvent};

const POINTS_PER_NODE: u32 = 10;
const ROUND_PAUSE_SECS: f32 = 0.5;
const MAX_SEQUENCE_LEN: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    /// Playing the sequence back to the player; taps are ignored
    Showing { next: usize, timer: f32 },
    /// Player's turn to reproduce
    Waiting,
    /// Between rounds; taps are ignored
    Pause { timer: f32 },
    /// Terminal, in either direction
    Done,
}

pub struct SequenceRecall {
    node_count: usize,
    /// Seconds between lit nodes during playback
    cadence: f32,
    rounds_total: u32,
    difficulty_extra: u32,
    reward_mult: u32,
    round: u32,
    sequence: Vec<usize>,
    input_pos: usize,
    stage: Stage,
    /// Node currently lit during playback, for rendering
    lit: Option<usize>,
    failed: bool,
    won: bool,
}

impl SequenceRecall {
    pub fn new(spec: LevelSpec) -> Self {
        let l = spec.level0();
        let m_s = spec.difficulty.speed_multiplier();
        let m_r = spec.difficulty.reward_multiplier();

        let node_count = match spec.level {
            ..=3 => 4,
            ..=6 => 5,
            _ => 6,
        };
        Self {
            node_count,
            cadence: (0.8 - l as f32 * 0.045).max(0.4) / m_s,
            rounds_total: 3 + u32::from(spec.level) / 3,
            difficulty_extra: m_r - 1,
            reward_mult: m_r,
            round: 1,
            sequence: Vec::new(),
            input_pos: 0,
            stage: Stage::Done,
            lit: None,
            failed: false,
            won: false,
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn rounds_total(&self) -> u32 {
        self.rounds_total
    }

    fn sequence_len(&self, core: &SessionCore) -> usize {
        let l = core.spec.level0();
        (3 + l / 2 + (self.round - 1) + self.difficulty_extra).min(MAX_SEQUENCE_LEN) as usize
    }

    fn start_round(&mut self, core: &mut SessionCore) {
        let len = self.sequence_len(core);
        self.sequence = (0..len)
            .map(|_| core.rng.random_range(0..self.node_count))
            .collect();
        self.input_pos = 0;
        // First node lights immediately, the rest on the cadence
        self.lit = Some(self.sequence[0]);
        core.push_event(SessionEvent::NodeShown {
            node: self.sequence[0],
        });
        self.stage = Stage::Showing {
            next: 1,
            timer: 0.0,
        };
    }
}

impl VariantPolicy for SequenceRecall {
    fn begin(&mut self, core: &mut SessionCore) {
        // One wrong node ends the session; the budget is informational
        core.max_misses = 1;
        self.start_round(core);
    }

    fn advance(&mut self, core: &mut SessionCore, dt: f32) {
        match self.stage {
            Stage::Showing { next, timer } => {
                let timer = timer + dt;
                if timer < self.cadence {
                    self.stage = Stage::Showing { next, timer };
                } else if next < self.sequence.len() {
                    self.lit = Some(self.sequence[next]);
                    core.push_event(SessionEvent::NodeShown {
                        node: self.sequence[next],
                    });
                    self.stage = Stage::Showing {
                        next: next + 1,
                        timer: 0.0,
                    };
                } else {
                    self.lit = None;
                    self.stage = Stage::Waiting;
                }
            }
            Stage::Pause { timer } => {
                let timer = timer + dt;
                if timer < ROUND_PAUSE_SECS {
                    self.stage = Stage::Pause { timer };
                } else {
                    self.start_round(core);
                }
            }
            Stage::Waiting | Stage::Done => {}
        }
    }

    fn handle(&mut self, core: &mut SessionCore, input: &InputEvent) {
        let InputEvent::Tap { index } = input else {
            return;
        };
        if self.stage != Stage::Waiting {
            return;
        }
        if *index != self.sequence[self.input_pos] {
            core.register_miss();
            self.failed = true;
            self.stage = Stage::Done;
            return;
        }
        self.input_pos += 1;
        if self.input_pos < self.sequence.len() {
            return;
        }

        // Full reproduction
        let scored = self.sequence.len() as u32 * POINTS_PER_NODE * self.reward_mult;
        core.add_score(scored);
        core.push_event(SessionEvent::Hit {
            points: scored,
            tier: HitTier::Perfect,
        });
        if self.round >= self.rounds_total {
            self.won = true;
            self.stage = Stage::Done;
        } else {
            self.round += 1;
            core.push_event(SessionEvent::RoundAdvanced { round: self.round });
            self.stage = Stage::Pause { timer: 0.0 };
        }
    }

    fn verdict(&self, _core: &SessionCore) -> Verdict {
        if self.failed {
            Verdict::Lost
        } else if self.won {
            Verdict::Won
        } else {
            Verdict::Continue
        }
    }

    fn entities(&self) -> Vec<EntityView> {
        (0..self.node_count)
            .map(|node| EntityView {
                lane: node,
                progress: if self.lit == Some(node) { 1.0 } else { 0.0 },
                pos: None,
                consumed: false,
            })
            .collect()
    }
}
