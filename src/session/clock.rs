//! Fixed-tick round clock
//!
//! One clock per session. `advance` folds wall time into fixed simulation
//! steps and reports, per step, a `Tick` plus any due interval timers in
//! registration order. Nothing here runs callbacks: events are returned to
//! the single caller, so two ticks of the same session can never execute
//! concurrently.
//!
//! Cancellation is hard: a cancelled timer will not fire even if it was
//! already due, and `cancel_all` bumps the clock epoch so every previously
//! issued `TimerId` goes stale. Stale ids are ignored rather than being
//! allowed to touch a timer slot from a later generation.

use crate::consts::{MAX_SUBSTEPS, TICK_DT};

/// Handle to a scheduled interval timer, valid for one clock epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId {
    index: u32,
    epoch: u64,
}

/// What happened during one fixed step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// One fixed simulation step of `TICK_DT` seconds
    Tick,
    /// An interval timer came due during this step
    TimerFired(TimerId),
}

#[derive(Debug)]
struct TimerSlot {
    period: f32,
    elapsed: f32,
    cancelled: bool,
}

/// Deterministic tick source with cancellable interval timers
#[derive(Debug)]
pub struct RoundClock {
    epoch: u64,
    accumulator: f32,
    tick_count: u64,
    timers: Vec<TimerSlot>,
}

impl Default for RoundClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundClock {
    pub fn new() -> Self {
        Self {
            epoch: 0,
            accumulator: 0.0,
            tick_count: 0,
            timers: Vec::new(),
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Register an interval timer firing every `period` seconds. Periods
    /// shorter than one tick fire once per tick.
    pub fn schedule(&mut self, period: f32) -> TimerId {
        debug_assert!(period > 0.0, "timer period must be positive");
        let index = self.timers.len() as u32;
        self.timers.push(TimerSlot {
            period: period.max(TICK_DT),
            elapsed: 0.0,
            cancelled: false,
        });
        TimerId {
            index,
            epoch: self.epoch,
        }
    }

    /// Cancel one timer. Stale ids (from before a `cancel_all`) are ignored.
    pub fn cancel(&mut self, id: TimerId) {
        if id.epoch != self.epoch {
            return;
        }
        if let Some(slot) = self.timers.get_mut(id.index as usize) {
            slot.cancelled = true;
        }
    }

    /// Cancel every outstanding timer and invalidate all issued ids
    pub fn cancel_all(&mut self) {
        self.timers.clear();
        self.accumulator = 0.0;
        self.epoch += 1;
    }

    pub fn is_live(&self, id: TimerId) -> bool {
        id.epoch == self.epoch
            && self
                .timers
                .get(id.index as usize)
                .map(|slot| !slot.cancelled)
                .unwrap_or(false)
    }

    /// Fold `dt` seconds of wall time into fixed steps. Steps beyond the
    /// substep cap are discarded so a long stall cannot snowball.
    pub fn advance(&mut self, dt: f32) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        self.accumulator += dt.max(0.0);

        let mut steps = 0;
        while self.accumulator >= TICK_DT {
            self.accumulator -= TICK_DT;
            if steps >= MAX_SUBSTEPS {
                continue;
            }
            steps += 1;
            self.tick_count += 1;
            events.push(ClockEvent::Tick);

            for (index, slot) in self.timers.iter_mut().enumerate() {
                if slot.cancelled {
                    continue;
                }
                slot.elapsed += TICK_DT;
                if slot.elapsed >= slot.period {
                    slot.elapsed -= slot.period;
                    events.push(ClockEvent::TimerFired(TimerId {
                        index: index as u32,
                        epoch: self.epoch,
                    }));
                }
            }
        }

        events
    }
}
