//! Runtime core: the supervision state machine and tunnel lifecycle.
//!
//! Internal modules:
//! - [`state`]: phase, loss detection and backoff gating for one run;
//! - [`sequencer`]: one ordered reconnect attempt;
//! - [`actor`]: the periodic sampling loop owning the state;
//! - [`supervisor`]: start/stop, status queries and event fan-out;
//! - [`builder`]: supervisor construction;
//! - [`shutdown`]: OS termination signals.

mod actor;
mod builder;
mod sequencer;
mod shutdown;
mod state;
mod supervisor;

pub use actor::LinkActor;
pub use builder::SupervisorBuilder;
pub use sequencer::{AttemptOutcome, NOT_ESTABLISHED, ReconnectSequencer};
pub use state::{LossCause, Observation, Phase, SupervisorState, Tick, Verdict};
pub use supervisor::Supervisor;
