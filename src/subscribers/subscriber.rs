//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for observing the tracker: log sinks,
//! presence dashboards, test probes.
//!
//! ```text
//! SubscriberSet ──► [bounded queue] ──► worker task ──► subscriber.on_event()
//!                                    └─► panic caught → EventKind::SubscriberPanicked
//! ```
//!
//! ## Rules
//! - Events arrive in FIFO order per subscriber.
//! - A full queue drops the event for that subscriber only and publishes
//!   `EventKind::SubscriberOverflow`.
//! - Subscribers never block the publisher or each other.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use idle_tracker::{Event, EventKind, Subscribe};
//!
//! struct Presence;
//!
//! #[async_trait]
//! impl Subscribe for Presence {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ValueChanged {
//!             // update a dashboard with ev.value
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "presence" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of runtime events.
///
/// Handlers run on a dedicated worker task; use async I/O and keep errors
/// internal. A panic is caught and reported, it does not stop the tracker.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
