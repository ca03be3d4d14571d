//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `RetryTimer`, `Publisher`, `ActivityBridge`, `Tracker`,
//!   the MQTT driver, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Tracker` listener (fans out to `SubscriberSet`) and tests.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
