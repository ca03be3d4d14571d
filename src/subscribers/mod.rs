//! # Event subscribers.
//!
//! ```text
//!   RetryTimer / Publisher / ActivityBridge ── publish(Event) ──► Bus
//!                                                                  │
//!                                                Tracker listener ─┘
//!                                                                  │
//!                                                   SubscriberSet::emit
//!                                                   ┌──────────────┼─────────┐
//!                                                   ▼              ▼         ▼
//!                                               LogWriter       Custom      ...
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
