//! The six mini-game simulation bodies.
//!
//! Each variant implements `VariantPolicy`: spawn policy, per-tick entity
//! advancement, hit testing, miss policy and terminal predicate. The
//! shared lifecycle (countdown, miss budget, event queue, outcome) lives
//! in the engine.

pub mod falling;
pub mod orbit;
pub mod pegdrop;
pub mod sequence;
pub mod signal;
pub mod tiles;
