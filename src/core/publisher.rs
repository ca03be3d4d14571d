//! # Publisher: the current value plus exactly one live retry timer.
//!
//! ```text
//! set_value(v, immediate)
//!   ├─► [lock] store v
//!   ├─► stopped?                  ─► keep v, start nothing
//!   ├─► immediate || no running timer?
//!   │     ├─ yes ─► cancel old timer ─► clear death ─► new RetryTimer(PublishJob) ─► start
//!   │     └─ no  ─► keep cadence; next tick publishes v
//!   └─► [unlock]
//!
//! PublishJob::run()  (timer context)
//!   └─► sink.publish(topic, current value) ─► Outcome
//! ```
//!
//! ## Rules
//! - Storing the value and swapping the timer happen under one lock, so two
//!   concurrent `set_value` calls never leave two timers running.
//! - Ticks publish the value stored *at tick time*, not the one that started the timer.
//! - `stop()` latches: later values are stored but never published.
//! - The owner learns about a dead timer through [`Publisher::died`] / [`Publisher::watch_death`].
//!   Starting a new timer clears the recorded death.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::state::TimerState;
use super::timer::{RetryTimer, TimerDeath, TimerExit};
use crate::config::Config;
use crate::error::ConfigError;
use crate::events::{Bus, Event, EventKind};
use crate::sink::SinkRef;
use crate::work::{Outcome, Work};

/// The timer's work: publish whatever value is current.
pub struct PublishJob {
    sink: SinkRef,
    topic: Arc<str>,
    value: RwLock<Option<Arc<str>>>,
}

impl PublishJob {
    fn new(sink: SinkRef, topic: Arc<str>) -> Self {
        Self {
            sink,
            topic,
            value: RwLock::new(None),
        }
    }

    fn current(&self) -> Option<Arc<str>> {
        self.value.read().clone()
    }
}

#[async_trait]
impl Work for PublishJob {
    fn name(&self) -> &str {
        &self.topic
    }

    async fn run(&self) -> Outcome {
        let Some(value) = self.current() else {
            return Outcome::failure("no value to publish");
        };
        match self.sink.publish(&self.topic, &value).await {
            Ok(()) => {
                debug!(topic = %self.topic, value = %value, "pushed value");
                Outcome::Success
            }
            Err(e) => {
                error!(
                    topic = %self.topic,
                    label = e.as_label(),
                    code = e.code(),
                    error = %e,
                    "failed to send message"
                );
                Outcome::failure(e)
            }
        }
    }
}

/// A started timer and its loop task.
struct LiveTimer {
    timer: RetryTimer,
    task: Option<JoinHandle<TimerExit>>,
}

#[derive(Default)]
struct Slot {
    live: Option<LiveTimer>,
    stopped: bool,
}

impl Slot {
    fn running(&self) -> bool {
        self.live
            .as_ref()
            .is_some_and(|l| l.timer.state() == TimerState::Running)
    }

    /// Latches the stop and cancels the live timer; returns its loop task.
    fn stop(&mut self) -> Option<JoinHandle<TimerExit>> {
        self.stopped = true;
        let live = self.live.take()?;
        live.timer.cancel();
        live.task
    }
}

/// Recurring publisher of a single value with forced updates.
pub struct Publisher {
    job: Arc<PublishJob>,
    interval: Duration,
    failure_threshold: u32,
    bus: Bus,
    rt: Handle,
    slot: Mutex<Slot>,
    death: watch::Sender<Option<TimerDeath>>,
}

impl Publisher {
    /// Creates an idle publisher; nothing is published until [`set_value`](Self::set_value).
    ///
    /// Timers are spawned on the runtime current at construction, so `set_value`
    /// may later be called from any thread.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn new(
        sink: SinkRef,
        topic: impl Into<Arc<str>>,
        cfg: &Config,
        bus: Bus,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let (death, _rx) = watch::channel(None);
        Ok(Self {
            job: Arc::new(PublishJob::new(sink, topic.into())),
            interval: cfg.interval,
            failure_threshold: cfg.failure_threshold,
            bus,
            rt: Handle::current(),
            slot: Mutex::new(Slot::default()),
            death,
        })
    }

    /// Stores `value`; restarts publishing now if `immediate` or if no timer is running.
    ///
    /// After [`stop`](Self::stop) the value is only stored.
    pub fn set_value(&self, value: impl Into<Arc<str>>, immediate: bool) {
        let value = value.into();
        let mut slot = self.slot.lock();

        *self.job.value.write() = Some(Arc::clone(&value));
        self.bus.publish(
            Event::new(EventKind::ValueChanged)
                .with_subject(Arc::clone(&self.job.topic))
                .with_value(value),
        );

        if slot.stopped {
            debug!(topic = %self.job.topic, "publisher stopped; value not published");
            return;
        }
        if slot.running() && !immediate {
            return;
        }

        if let Some(old) = slot.live.take() {
            debug!(
                timer = old.timer.id(),
                state = old.timer.state().as_str(),
                "replacing publish timer"
            );
            old.timer.cancel();
        }
        let timer = match RetryTimer::new(
            self.interval,
            self.failure_threshold,
            self.job.clone(),
            self.bus.clone(),
        ) {
            Ok(t) => t.with_death_notifier(self.death.clone()),
            Err(e) => {
                error!(error = %e, "cannot create publish timer");
                return;
            }
        };
        self.death.send_replace(None);
        let task = timer.start_on(&self.rt);
        slot.live = Some(LiveTimer { timer, task });
    }

    /// Cancels the current timer, if any, and stops publishing for good. Idempotent.
    pub fn stop(&self) {
        self.slot.lock().stop();
    }

    /// Like [`stop`](Self::stop), then waits for the cancelled timer's loop to exit.
    ///
    /// Returns `None` when there was no timer to stop.
    pub async fn stop_and_wait(&self) -> Option<TimerExit> {
        let task = self.slot.lock().stop()?;
        task.await.ok()
    }

    pub fn topic(&self) -> &str {
        &self.job.topic
    }

    /// Value the next tick will publish.
    pub fn value(&self) -> Option<Arc<str>> {
        self.job.current()
    }

    pub fn is_running(&self) -> bool {
        self.slot.lock().running()
    }

    pub fn is_stopped(&self) -> bool {
        self.slot.lock().stopped
    }

    pub fn current_timer_id(&self) -> Option<u64> {
        self.slot.lock().live.as_ref().map(|l| l.timer.id())
    }

    /// Receiver that turns `Some` once the current timer dies.
    pub fn watch_death(&self) -> watch::Receiver<Option<TimerDeath>> {
        self.death.subscribe()
    }

    /// Resolves when the current timer, or one started later, dies.
    pub async fn died(&self) -> TimerDeath {
        let mut rx = self.death.subscribe();
        let death = rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|seen| (*seen).clone());
        match death {
            Some(death) => death,
            None => std::future::pending().await,
        }
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.stop();
    }
}
