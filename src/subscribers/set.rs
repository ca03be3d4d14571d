//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! ```text
//!    emit(&Event)
//!        │                        (Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_event()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//! ```
//!
//! `emit` never awaits. There is no ordering across subscribers, and an event
//! dropped on overflow is not retried.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};

use super::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Per-subscriber bounded queues, each drained by its own worker task.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Overflow and panic reports go to `bus`.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            workers.push(tokio::spawn(drain(sub, rx, bus.clone())));
            channels.push(SubscriberChannel { name, sender: tx });
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Clones `event` once and hands it to every subscriber.
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Hands a shared event to every subscriber without blocking.
    ///
    /// Overflow reports are never re-reported, so a saturated subscriber
    /// cannot feed itself.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Closes every queue and waits for the workers to drain them.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }
}

async fn drain(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        let fut = sub.on_event(ev.as_ref());
        if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
            let info = if let Some(msg) = panic_err.downcast_ref::<&'static str>() {
                (*msg).to_string()
            } else if let Some(msg) = panic_err.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic".to_string()
            };
            bus.publish(Event::subscriber_panicked(sub.name(), info));
        }
    }
}
