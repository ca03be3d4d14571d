//! # RetryTimer: fire now, then on a cadence, until cancelled or dead.
//!
//! Runs one [`Work`](crate::Work) immediately on start and again after every
//! `interval`, counting consecutive failures. A sustained outage surfaces as a
//! terminal [`TimerState::Died`] instead of a loop that publishes into a void.
//!
//! ## Event flow
//! ```text
//! start() ──► TimerStarted
//!   loop {
//!     ├─► cancelled?                          ─► TimerCancelled, exit
//!     ├─► work.run()
//!     │     ├─ Success    ─► failures = 0     ─► TickSucceeded
//!     │     └─ Failure(e) ─► failures += 1    ─► TickFailed{failures, e}
//!     ├─► cancelled?                          ─► TimerCancelled, exit
//!     ├─► threshold > 0 && failures >= threshold ─► TimerDied, exit
//!     └─► sleep(interval) (cancellable)       ─► TimerCancelled, exit
//!   }
//! ```
//!
//! ## Rules
//! - Invocations are **sequential**; the next one starts `interval` after the previous returned.
//! - `cancel()` before `start()` prevents the first invocation.
//! - `cancel()` during the sleep wakes the loop, which exits without invoking again.
//!   Cancellation wins over an elapsed sleep that was not yet observed.
//! - An invocation in flight when `cancel()` is called completes; nothing is scheduled after it,
//!   and the exit is reported as `Cancelled` even if that invocation reached the threshold.
//! - `failure_threshold = 0` disables death; only `cancel()` stops the loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use super::state::{StateCell, TimerState};
use crate::error::ConfigError;
use crate::events::{Bus, Event, EventKind};
use crate::work::{Outcome, WorkRef};

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Why a timer's loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerExit {
    Cancelled,
    Died(TimerDeath),
}

/// Details of a timer that hit its failure threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerDeath {
    pub timer_id: u64,
    /// Length of the failure run that killed the timer.
    pub failures: u32,
    /// Diagnostic of the final failed invocation.
    pub last_error: String,
}

/// State shared between the timer handle and its background loop.
#[derive(Debug)]
struct TimerInner {
    id: u64,
    interval: Duration,
    failure_threshold: u32,
    token: CancellationToken,
    state: StateCell,
    failures: AtomicU32,
}

/// A cancellable, single-use scheduled-publish session.
///
/// Owned by exactly one [`Publisher`](crate::Publisher); once cancelled or dead it
/// is dropped and replaced, never restarted.
pub struct RetryTimer {
    inner: Arc<TimerInner>,
    work: WorkRef,
    bus: Bus,
    death: Option<watch::Sender<Option<TimerDeath>>>,
}

impl RetryTimer {
    /// Creates a timer in the `Created` state.
    ///
    /// `failure_threshold = 0` means infinite retries. A zero `interval` is rejected.
    pub fn new(
        interval: Duration,
        failure_threshold: u32,
        work: WorkRef,
        bus: Bus,
    ) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(Self {
            inner: Arc::new(TimerInner {
                id: NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed),
                interval,
                failure_threshold,
                token: CancellationToken::new(),
                state: StateCell::new(),
                failures: AtomicU32::new(0),
            }),
            work,
            bus,
            death: None,
        })
    }

    /// Stores the death details in `tx` when the timer dies.
    pub fn with_death_notifier(mut self, tx: watch::Sender<Option<TimerDeath>>) -> Self {
        self.death = Some(tx);
        self
    }

    /// Starts the loop on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime; use [`start_on`](Self::start_on) there.
    pub fn start(&self) -> Option<JoinHandle<TimerExit>> {
        self.start_on(&Handle::current())
    }

    /// Starts the loop on `rt`.
    ///
    /// Returns `None` (and does nothing) unless the timer is still `Created`.
    pub fn start_on(&self, rt: &Handle) -> Option<JoinHandle<TimerExit>> {
        if !self
            .inner
            .state
            .transition(TimerState::Created, TimerState::Running)
        {
            return None;
        }
        let inner = Arc::clone(&self.inner);
        let work = Arc::clone(&self.work);
        let bus = self.bus.clone();
        let death = self.death.clone();
        Some(rt.spawn(run_loop(inner, work, bus, death)))
    }

    /// Requests cancellation. Idempotent; safe before `start()` and after exit.
    pub fn cancel(&self) {
        self.inner.token.cancel();
        if self
            .inner
            .state
            .transition(TimerState::Created, TimerState::Cancelled)
        {
            self.bus.publish(self.event(EventKind::TimerCancelled));
            return;
        }
        self.inner
            .state
            .transition(TimerState::Running, TimerState::Cancelled);
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn state(&self) -> TimerState {
        self.inner.state.load()
    }

    /// Current length of the trailing failure run.
    pub fn consecutive_failures(&self) -> u32 {
        self.inner.failures.load(Ordering::Acquire)
    }

    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    pub fn failure_threshold(&self) -> u32 {
        self.inner.failure_threshold
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind)
            .with_subject(self.work.name())
            .with_timer(self.inner.id)
    }
}

impl std::fmt::Debug for RetryTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryTimer")
            .field("id", &self.inner.id)
            .field("work", &self.work.name())
            .field("state", &self.state().as_str())
            .field("failures", &self.consecutive_failures())
            .finish()
    }
}

async fn run_loop(
    inner: Arc<TimerInner>,
    work: WorkRef,
    bus: Bus,
    death: Option<watch::Sender<Option<TimerDeath>>>,
) -> TimerExit {
    let event = |kind| {
        Event::new(kind)
            .with_subject(work.name())
            .with_timer(inner.id)
    };

    if inner.token.is_cancelled() {
        bus.publish(event(EventKind::TimerCancelled));
        return TimerExit::Cancelled;
    }
    bus.publish(event(EventKind::TimerStarted));

    loop {
        if inner.token.is_cancelled() {
            bus.publish(event(EventKind::TimerCancelled));
            return TimerExit::Cancelled;
        }
        let outcome = work.run().await;
        let failures = match &outcome {
            Outcome::Success => {
                inner.failures.store(0, Ordering::Release);
                bus.publish(event(EventKind::TickSucceeded).with_failures(0));
                0
            }
            Outcome::Failure(diagnostic) => {
                let n = inner.failures.fetch_add(1, Ordering::AcqRel) + 1;
                bus.publish(
                    event(EventKind::TickFailed)
                        .with_failures(n)
                        .with_reason(diagnostic.as_str()),
                );
                n
            }
        };

        if inner.token.is_cancelled() {
            bus.publish(event(EventKind::TimerCancelled));
            return TimerExit::Cancelled;
        }

        if inner.failure_threshold > 0 && failures >= inner.failure_threshold {
            if !inner.state.transition(TimerState::Running, TimerState::Died) {
                bus.publish(event(EventKind::TimerCancelled));
                return TimerExit::Cancelled;
            }
            let last_error = outcome.diagnostic().unwrap_or_default().to_string();
            let info = TimerDeath {
                timer_id: inner.id,
                failures,
                last_error,
            };
            bus.publish(
                event(EventKind::TimerDied)
                    .with_failures(failures)
                    .with_reason(info.last_error.as_str()),
            );
            if let Some(tx) = &death {
                tx.send_replace(Some(info.clone()));
            }
            return TimerExit::Died(info);
        }

        let sleep = time::sleep(inner.interval);
        tokio::pin!(sleep);
        select! {
            biased;
            _ = inner.token.cancelled() => {
                bus.publish(event(EventKind::TimerCancelled));
                return TimerExit::Cancelled;
            }
            _ = &mut sleep => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::WorkFn;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Work that replays scripted results, then succeeds forever.
    fn scripted(results: &[bool], calls: Arc<AtomicUsize>) -> WorkRef {
        let script = Arc::new(parking_lot::Mutex::new(
            results.iter().copied().collect::<VecDeque<_>>(),
        ));
        WorkFn::arc("scripted", move || {
            let script = Arc::clone(&script);
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                match script.lock().pop_front() {
                    Some(false) => Outcome::Failure(format!("call {n} failed")),
                    _ => Outcome::Success,
                }
            }
        })
    }

    #[test]
    fn zero_interval_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let res = RetryTimer::new(Duration::ZERO, 3, scripted(&[], calls), Bus::new(8));
        assert!(matches!(res, Err(ConfigError::ZeroInterval)));
    }

    #[tokio::test(start_paused = true)]
    async fn debug_output_names_the_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let timer = RetryTimer::new(Duration::from_secs(1), 3, scripted(&[], calls), Bus::new(8))
            .expect("timer");
        assert!(format!("{timer:?}").contains(r#"state: "created""#));
        timer.cancel();
        assert!(format!("{timer:?}").contains(r#"state: "cancelled""#));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_run_resets_on_success_and_dies_at_threshold() {
        let calls = Arc::new(AtomicUsize::new(0));
        let bus = Bus::new(64);
        let mut rx = bus.subscribe();
        let work = scripted(&[false, false, true, false, false, false], calls.clone());
        let timer = RetryTimer::new(Duration::from_secs(5), 3, work, bus).expect("timer");

        let exit = timer.start().expect("started").await.expect("join");
        match exit {
            TimerExit::Died(death) => {
                assert_eq!(death.failures, 3);
                assert_eq!(death.last_error, "call 6 failed");
            }
            other => panic!("expected death, got {other:?}"),
        }
        assert_eq!(timer.state(), TimerState::Died);
        assert_eq!(calls.load(Ordering::SeqCst), 6);

        let mut observed = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev.kind, EventKind::TickSucceeded | EventKind::TickFailed) {
                observed.push(ev.failures.unwrap_or_default());
            }
        }
        assert_eq!(observed, vec![1, 2, 0, 1, 2, 3]);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 6, "no invocation after death");
    }

    /// Expected failure counts per invocation, and whether the run ends in death.
    fn trailing_failures(results: &[bool], threshold: u32) -> (Vec<u32>, bool) {
        let mut run = 0;
        let mut counts = Vec::new();
        for &ok in results {
            run = if ok { 0 } else { run + 1 };
            counts.push(run);
            if threshold > 0 && run >= threshold {
                return (counts, true);
            }
        }
        (counts, false)
    }

    #[tokio::test(start_paused = true)]
    async fn failure_count_follows_trailing_failure_run() {
        let cases: &[(&str, &[bool], u32)] = &[
            ("all succeed", &[true; 8], 3),
            ("all fail without threshold", &[false; 12], 0),
            ("alternating", &[false, true, false, true, false, true, false], 2),
            (
                "one short of threshold then reset",
                &[false, false, true, false, false, true, false, false, false],
                3,
            ),
            ("threshold of one", &[true, true, false, true], 1),
            ("run below threshold", &[false; 6], 7),
            ("dies mid script", &[true, false, false, true, true], 2),
        ];

        for &(name, results, threshold) in cases {
            let (expected, dies) = trailing_failures(results, threshold);
            let calls = Arc::new(AtomicUsize::new(0));
            let bus = Bus::new(64);
            let mut rx = bus.subscribe();
            let timer = RetryTimer::new(
                Duration::from_secs(1),
                threshold,
                scripted(results, calls.clone()),
                bus,
            )
            .expect("timer");
            let handle = timer.start().expect("started");

            // invocations at t = 0, 1, .., len-1; cancel halfway through the next sleep
            let last = results.len() as u64 - 1;
            time::sleep(Duration::from_millis(1_000 * last + 500)).await;
            timer.cancel();
            let exit = handle.await.expect("join");

            let mut observed = Vec::new();
            while let Ok(ev) = rx.try_recv() {
                if matches!(ev.kind, EventKind::TickSucceeded | EventKind::TickFailed) {
                    observed.push(ev.failures.unwrap_or_default());
                }
            }
            assert_eq!(observed, expected, "{name}");
            assert_eq!(calls.load(Ordering::SeqCst), expected.len(), "{name}");
            assert_eq!(matches!(exit, TimerExit::Died(_)), dies, "{name}: {exit:?}");
            let state = if dies { TimerState::Died } else { TimerState::Cancelled };
            assert_eq!(timer.state(), state, "{name}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_threshold_never_dies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let work = scripted(&[false; 40], calls.clone());
        let timer = RetryTimer::new(Duration::from_secs(1), 0, work, Bus::new(256)).expect("timer");
        let handle = timer.start().expect("started");

        time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.consecutive_failures(), 31);

        timer.cancel();
        assert_eq!(handle.await.expect("join"), TimerExit::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_start_prevents_first_invocation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let timer =
            RetryTimer::new(Duration::from_secs(1), 3, scripted(&[], calls.clone()), Bus::new(8))
                .expect("timer");
        timer.cancel();
        timer.cancel();

        assert!(timer.start().is_none());
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(timer.state(), TimerState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_sleep_stops_further_invocations() {
        let calls = Arc::new(AtomicUsize::new(0));
        let timer =
            RetryTimer::new(Duration::from_secs(10), 3, scripted(&[], calls.clone()), Bus::new(8))
                .expect("timer");
        let handle = timer.start().expect("started");
        assert!(timer.start().is_none(), "second start is a no-op");

        time::sleep(Duration::from_secs(3)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        timer.cancel();
        assert_eq!(handle.await.expect("join"), TimerExit::Cancelled);
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_wins_over_elapsed_sleep() {
        for _ in 0..20 {
            let calls = Arc::new(AtomicUsize::new(0));
            let timer = RetryTimer::new(
                Duration::from_millis(5),
                0,
                scripted(&[], calls.clone()),
                Bus::new(8),
            )
            .expect("timer");
            let handle = timer.start().expect("started");
            while calls.load(Ordering::SeqCst) == 0 {
                tokio::task::yield_now().await;
            }

            // hold the only worker past the deadline, then cancel before the loop wakes
            std::thread::sleep(Duration::from_millis(20));
            timer.cancel();

            assert_eq!(handle.await.expect("join"), TimerExit::Cancelled);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_invocation_completes_but_superseded_timer_does_not_die() {
        let calls = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let work: WorkRef = {
            let calls = calls.clone();
            let finished = finished.clone();
            WorkFn::arc("slow", move || {
                let calls = calls.clone();
                let finished = finished.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    time::sleep(Duration::from_secs(4)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Outcome::failure("broker unreachable")
                }
            })
        };
        let timer = RetryTimer::new(Duration::from_secs(1), 1, work, Bus::new(8)).expect("timer");
        let handle = timer.start().expect("started");

        time::sleep(Duration::from_secs(1)).await;
        timer.cancel();

        assert_eq!(handle.await.expect("join"), TimerExit::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert_eq!(timer.state(), TimerState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn death_is_reported_through_notifier() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = watch::channel(None);
        let timer = RetryTimer::new(
            Duration::from_secs(2),
            2,
            scripted(&[false, false], calls),
            Bus::new(8),
        )
        .expect("timer")
        .with_death_notifier(tx);
        let id = timer.id();
        let _handle = timer.start().expect("started");

        rx.changed().await.expect("notified");
        let death = rx.borrow().clone().expect("death recorded");
        assert_eq!(death.timer_id, id);
        assert_eq!(death.failures, 2);
    }
}
