//! # LogWriter: runtime events as `tracing` records.
//!
//! | Event                                          | Level   |
//! |------------------------------------------------|---------|
//! | `TickSucceeded`, `ValueChanged`                | debug   |
//! | `TickFailed`, `SubscriberOverflow/Panicked`    | warn    |
//! | `TimerDied`, `NoSourceFound`, `BrokerRefused`  | error, `critical = true` |
//! | everything else                                | info    |

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that forwards every event to the `tracing` dispatcher.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let subject = e.subject.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::TimerStarted => {
                info!(seq = e.seq, timer = e.timer, work = subject, "timer started");
            }
            EventKind::TickSucceeded => {
                debug!(seq = e.seq, timer = e.timer, work = subject, "tick ok");
            }
            EventKind::TickFailed => {
                warn!(
                    seq = e.seq,
                    timer = e.timer,
                    work = subject,
                    failures = e.failures,
                    reason,
                    "tick failed"
                );
            }
            EventKind::TimerCancelled => {
                info!(seq = e.seq, timer = e.timer, work = subject, "timer cancelled");
            }
            EventKind::TimerDied => {
                error!(
                    critical = true,
                    seq = e.seq,
                    timer = e.timer,
                    work = subject,
                    failures = e.failures,
                    reason,
                    "timer died"
                );
            }
            EventKind::ValueChanged => {
                debug!(
                    seq = e.seq,
                    topic = subject,
                    value = e.value.as_deref().unwrap_or("-"),
                    "value changed"
                );
            }
            EventKind::SourceBound => {
                info!(seq = e.seq, source = subject, "activity source bound");
            }
            EventKind::NoSourceFound => {
                error!(critical = true, seq = e.seq, reason, "no activity source");
            }
            EventKind::BrokerConnected => {
                info!(seq = e.seq, "broker connected");
            }
            EventKind::BrokerRefused => {
                error!(critical = true, seq = e.seq, reason, "broker refused");
            }
            EventKind::ShutdownRequested => {
                info!(seq = e.seq, "shutdown requested");
            }
            EventKind::SubscriberOverflow => {
                warn!(seq = e.seq, subscriber = subject, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                warn!(seq = e.seq, subscriber = subject, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
