//! # Runtime events emitted by timers, the publisher and the activity bridge.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Timer events**: one publish session's lifecycle (started, ticks, cancelled, died)
//! - **Publisher events**: value updates
//! - **Bridge/broker events**: activity source binding and broker connection outcome
//! - **Subscriber events**: fan-out health (overflow, panic)
//!
//! The [`Event`] struct carries optional metadata such as the subject
//! (work name, source identity or subscriber name), timer id, failure count
//! and the published value.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use idle_tracker::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TickFailed)
//!     .with_subject("box1/user/alice/status")
//!     .with_timer(3)
//!     .with_failures(2)
//!     .with_reason("publish rejected (code 4)");
//!
//! assert_eq!(ev.kind, EventKind::TickFailed);
//! assert_eq!(ev.failures, Some(2));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `subject` (subscriber name) and `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `subject` (subscriber name) and `reason`.
    SubscriberOverflow,

    // === Timer events ===
    /// A retry timer entered `Running` and is about to invoke its work.
    ///
    /// Sets `subject` (work name) and `timer`.
    TimerStarted,

    /// One invocation succeeded; the failure counter is back to zero.
    ///
    /// Sets `subject`, `timer` and `failures = 0`.
    TickSucceeded,

    /// One invocation failed.
    ///
    /// Sets `subject`, `timer`, `failures` (current run length) and `reason`.
    TickFailed,

    /// The timer was cancelled and will not invoke its work again.
    ///
    /// Sets `subject` and `timer`.
    TimerCancelled,

    /// The timer hit its consecutive-failure threshold. Terminal.
    ///
    /// Sets `subject`, `timer`, `failures` and `reason` (last failure).
    TimerDied,

    // === Publisher events ===
    /// The publisher stored a new value.
    ///
    /// Sets `subject` (topic) and `value`.
    ValueChanged,

    // === Bridge / broker events ===
    /// The activity bridge bound to a source.
    ///
    /// Sets `subject` (source identity).
    SourceBound,

    /// No candidate activity source responded.
    ///
    /// Sets `reason` (candidates tried).
    NoSourceFound,

    /// The broker accepted the connection.
    BrokerConnected,

    /// The broker refused or dropped the connection permanently.
    ///
    /// Sets `reason`.
    BrokerRefused,

    /// Shutdown requested (OS signal observed).
    ShutdownRequested,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Work name, topic, source identity or subscriber name.
    pub subject: Option<Arc<str>>,
    /// Id of the retry timer that emitted the event.
    pub timer: Option<u64>,
    /// Consecutive failure count after the invocation.
    pub failures: Option<u32>,
    /// Payload value, for publisher events.
    pub value: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            subject: None,
            timer: None,
            failures: None,
            value: None,
            reason: None,
        }
    }

    /// Attaches a subject.
    #[inline]
    pub fn with_subject(mut self, subject: impl Into<Arc<str>>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attaches a timer id.
    #[inline]
    pub fn with_timer(mut self, id: u64) -> Self {
        self.timer = Some(id);
        self
    }

    /// Attaches a consecutive failure count.
    #[inline]
    pub fn with_failures(mut self, n: u32) -> Self {
        self.failures = Some(n);
        self
    }

    /// Attaches a payload value.
    #[inline]
    pub fn with_value(mut self, value: impl Into<Arc<str>>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_subject(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_subject(subscriber)
            .with_reason(info)
    }
}
