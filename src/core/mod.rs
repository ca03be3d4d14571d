//! Runtime core: retry timer, publisher and the tracker that owns them.
//!
//! - `timer`: one recurring unit of work with a consecutive-failure budget;
//! - `publisher`: current value plus exactly one live timer;
//! - `tracker`: binds sources, waits for a stop condition, tears down;
//! - `shutdown`: OS termination signals;
//! - `state`: timer lifecycle states.

mod publisher;
mod shutdown;
mod state;
mod timer;
mod tracker;

pub use publisher::{PublishJob, Publisher};
pub use shutdown::wait_for_shutdown_signal;
pub use state::TimerState;
pub use timer::{RetryTimer, TimerDeath, TimerExit};
pub use tracker::Tracker;
