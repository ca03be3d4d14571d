//! # Tracker: process-level owner of the publisher and the activity bridge.
//!
//! ```text
//! Tracker::new(cfg, sink, topic, subscribers)
//!   ├─► Bus ─► listener task ─► SubscriberSet::emit ─► LogWriter, ...
//!   └─► Publisher (idle)
//!
//! Tracker::run(sources, until)
//!   ├─► ActivityBridge::bind(sources) ──fail──► NoActivitySource
//!   ├─► select! {
//!   │     until           ─► Ok(()) | Err(broker / signal error)
//!   │     publisher.died  ─► Err(PublisherDied)
//!   │   }
//!   └─► unbind bridge, stop publisher and wait for its timer (always)
//!
//! Tracker::shutdown()
//!   └─► stop publisher ─► wait for timer exit ─► stop listener ─► drain subscribers
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use idle_tracker::{Config, LocalSink, Tracker};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sink = Arc::new(LocalSink::new());
//! let tracker = Tracker::new(&Config::default(), sink, "box1/user/alice/status", vec![])
//!     .expect("valid config");
//!
//! // No sources: the run fails fast without publishing anything.
//! let res = tracker.run(&[], async { Ok(()) }).await;
//! assert!(res.is_err());
//! tracker.shutdown().await;
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio::select;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::publisher::Publisher;
use crate::bridge::{ActivityBridge, SourceRef};
use crate::config::Config;
use crate::error::{ConfigError, RuntimeError};
use crate::events::{Bus, Event};
use crate::sink::SinkRef;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Wires bus, subscribers, publisher and bridge; reports why tracking stopped.
pub struct Tracker {
    bus: Bus,
    subs: Arc<SubscriberSet>,
    publisher: Arc<Publisher>,
    listener: Option<JoinHandle<()>>,
    listener_token: CancellationToken,
}

impl Tracker {
    /// Builds the runtime pieces. Must be called inside a Tokio runtime.
    pub fn new(
        cfg: &Config,
        sink: SinkRef,
        topic: impl Into<Arc<str>>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        let listener_token = CancellationToken::new();
        let listener = tokio::spawn(forward(
            bus.subscribe(),
            Arc::clone(&subs),
            listener_token.clone(),
        ));
        let publisher = Arc::new(Publisher::new(sink, topic, cfg, bus.clone())?);
        if !subs.is_empty() {
            debug!(subscribers = subs.len(), "event subscribers attached");
        }
        debug!(
            topic = publisher.topic(),
            interval = ?cfg.interval,
            failure_limit = ?cfg.failure_limit(),
            "tracker ready"
        );

        Ok(Self {
            bus,
            subs,
            publisher,
            listener: Some(listener),
            listener_token,
        })
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    /// Binds to the first responsive source and publishes until `until`
    /// resolves or the publisher gives up.
    ///
    /// `until` is the owner's stop condition: a shutdown signal (`Ok`) or a
    /// broker connection failure (`Err`). Publishing is stopped and the
    /// bridge unbound before this returns, whatever the outcome.
    pub async fn run<F>(&self, sources: &[SourceRef], until: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = Result<(), RuntimeError>>,
    {
        let mut bridge = ActivityBridge::new(Arc::clone(&self.publisher), self.bus.clone());
        let res = match bridge.bind(sources).await {
            Ok(_) => {
                select! {
                    r = until => r,
                    death = self.publisher.died() => Err(RuntimeError::PublisherDied(death)),
                }
            }
            Err(e) => Err(e),
        };

        bridge.unbind();
        self.publisher.stop_and_wait().await;

        match &res {
            Ok(()) => info!(topic = self.publisher.topic(), "tracker stopped"),
            Err(e) => error!(
                critical = true,
                label = e.as_label(),
                error = %e,
                "tracker stopped"
            ),
        }
        res
    }

    /// Stops publishing, forwards pending events and drains subscriber queues.
    ///
    /// The timer's final event is on the bus before the listener is stopped.
    pub async fn shutdown(mut self) {
        self.publisher.stop_and_wait().await;
        let subs = Arc::clone(&self.subs);
        let listener = self.listener.take();
        drop(self);
        if let Some(listener) = listener {
            let _ = listener.await;
        }
        match Arc::try_unwrap(subs) {
            Ok(set) => set.shutdown().await,
            Err(_) => warn!("subscriber set still shared; skipping drain"),
        }
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.listener_token.cancel();
    }
}

async fn forward(
    mut rx: broadcast::Receiver<Event>,
    subs: Arc<SubscriberSet>,
    token: CancellationToken,
) {
    loop {
        select! {
            biased;
            msg = rx.recv() => match msg {
                Ok(ev) => subs.emit(&ev),
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "event listener lagged"),
                Err(RecvError::Closed) => return,
            },
            _ = token.cancelled() => break,
        }
    }
    while let Ok(ev) = rx.try_recv() {
        subs.emit(&ev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::sink::LocalSink;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.kinds.lock().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn shutdown_delivers_the_final_timer_event() {
        let recorder = Arc::new(Recorder {
            kinds: Mutex::new(Vec::new()),
        });
        let tracker = Tracker::new(
            &Config::default(),
            Arc::new(LocalSink::new()),
            "t",
            vec![recorder.clone() as Arc<dyn Subscribe>],
        )
        .expect("tracker");

        tracker.publisher().set_value("active", false);
        tokio::task::yield_now().await;
        tracker.shutdown().await;

        let kinds = recorder.kinds.lock().clone();
        assert_eq!(kinds.first(), Some(&EventKind::ValueChanged));
        assert_eq!(kinds.last(), Some(&EventKind::TimerCancelled), "{kinds:?}");
    }

    #[tokio::test]
    async fn no_sources_stops_before_publishing() {
        let sink = Arc::new(LocalSink::new());
        let tracker =
            Tracker::new(&Config::default(), sink.clone(), "t", vec![]).expect("tracker");

        let err = tracker
            .run(&[], async { Ok(()) })
            .await
            .expect_err("nothing to bind");
        assert!(matches!(err, RuntimeError::NoActivitySource { .. }));
        assert_ne!(err.exit_code(), 0);
        assert!(tracker.publisher().value().is_none());
        assert!(sink.published().is_empty());
        tracker.shutdown().await;
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let cfg = Config {
            interval: std::time::Duration::ZERO,
            ..Config::default()
        };
        let res = Tracker::new(&cfg, Arc::new(LocalSink::new()), "t", vec![]);
        assert!(matches!(res, Err(ConfigError::ZeroInterval)));
    }
}
