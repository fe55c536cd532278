//! Session module
//!
//! All gameplay logic lives here and is deterministic:
//! - Fixed timestep only (`RoundClock`)
//! - Seeded RNG only (one `Pcg32` per session)
//! - No rendering or platform dependencies

pub mod clock;
pub mod engine;
pub mod state;
pub mod variants;

pub use clock::{ClockEvent, RoundClock, TimerId};
pub use engine::{Session, SessionHandle, VariantPolicy, Verdict, start_session};
pub use state::{
    EntityView, HitTier, InputEvent, Outcome, SessionCore, SessionEvent, SessionPhase,
};
