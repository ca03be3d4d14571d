//! # idle-tracker
//!
//! Publishes whether a desktop user is **active** or **inactive** to a message
//! bus, driven by the screensaver's state.
//!
//! The core is a small scheduling primitive, a [`RetryTimer`] that runs one
//! unit of work now and then on a fixed cadence until it is cancelled or fails
//! too many times in a row. A [`Publisher`] keeps exactly one such timer alive
//! for the current value, and an [`ActivityBridge`] turns screensaver
//! notifications into publisher updates.
//!
//! ## Architecture
//! ```text
//!    ┌────────────────────┐  ActiveChanged(idle)   ┌──────────────────────┐
//!    │  ActivitySource    │ ─────────────────────► │   ActivityBridge     │
//!    │ (screensaver, ...) │ ◄── current_state() ── │ idle → "inactive"    │
//!    └────────────────────┘                        │ busy → "active"      │
//!                                                  └──────────┬───────────┘
//!                                                set_value(v, immediate)
//!                                                             ▼
//!                                                  ┌──────────────────────┐
//!                                                  │      Publisher       │
//!                                                  │ value + one timer    │
//!                                                  └──────────┬───────────┘
//!                                                             ▼
//!    ┌────────────────────┐   publish(topic, v)    ┌──────────────────────┐
//!    │    PublishSink     │ ◄───────────────────── │      RetryTimer      │
//!    │ (MQTT, LocalSink)  │                        │ now, then every N s  │
//!    └────────────────────┘                        └──────────┬───────────┘
//!                                                             │ Events
//!                                                             ▼
//!                                   Bus ──► Tracker listener ──► SubscriberSet
//!                                                                  ├─► LogWriter
//!                                                                  └─► custom
//! ```
//!
//! ### Timer lifecycle
//! ```text
//! Created ──start()──► Running ──cancel()──────────────► Cancelled
//!    │                    └──failures ≥ threshold──────► Died
//!    └──cancel()──────────────────────────────────────► Cancelled
//! ```
//!
//! ## Features
//! | Area            | Description                                            | Key types                                  |
//! |-----------------|--------------------------------------------------------|--------------------------------------------|
//! | **Scheduling**  | Immediate-then-periodic work with a failure budget     | [`RetryTimer`], [`Work`], [`Outcome`]      |
//! | **Publishing**  | One live timer per value, forced updates               | [`Publisher`], [`PublishSink`]             |
//! | **Activity**    | First responsive source wins, changes preempt cadence  | [`ActivityBridge`], [`ActivitySource`]     |
//! | **Ownership**   | Binds, waits for a stop condition, tears down          | [`Tracker`]                                |
//! | **Events**      | Lifecycle events for logging and custom observers      | [`Event`], [`Subscribe`], [`LogWriter`]    |
//! | **Errors**      | Typed errors with stable labels and exit codes         | [`RuntimeError`], [`PublishError`]         |
//!
//! ## Optional features
//! - `mqtt`: `sink::mqtt::MqttSink` over `rumqttc`.
//! - `dbus`: `bridge::dbus::ScreenSaverSource` over the session bus (`zbus`).
//!
//! The `idle-tracker` binary needs both.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use idle_tracker::{Bus, Config, LocalSink, Publisher};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sink = Arc::new(LocalSink::new());
//!     let cfg = Config { interval: Duration::from_millis(50), ..Config::default() };
//!     let publisher = Publisher::new(sink.clone(), "box1/user/alice/status", &cfg, Bus::default())?;
//!
//!     publisher.set_value("active", false);
//!     tokio::time::sleep(Duration::from_millis(120)).await;
//!     publisher.stop();
//!
//!     assert!(sink.payloads().iter().all(|p| p == "active"));
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod logging;
pub mod sink;
pub mod subscribers;
pub mod work;

pub use bridge::{
    ActivityBridge, ActivityHandler, ActivitySource, ActivityValue, BridgeState, SourceRef,
};
pub use config::{BrokerConfig, Config};
pub use crate::core::{
    PublishJob, Publisher, RetryTimer, TimerDeath, TimerExit, TimerState, Tracker,
    wait_for_shutdown_signal,
};
pub use error::{ConfigError, PublishError, RuntimeError, SourceError};
pub use events::{Bus, Event, EventKind};
pub use sink::{LocalSink, PublishSink, Published, SinkRef};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use work::{Outcome, Work, WorkFn, WorkRef};
