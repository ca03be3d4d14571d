//! # Publish sinks.
//!
//! A [`PublishSink`] is the message-bus client seen from the publisher: one
//! `publish(topic, payload)` call per tick, `Ok` meaning return code `0`.
//! The sink owns its connection lifecycle; the core never retries inside a call.
//!
//! - [`LocalSink`]: in-memory sink for tests and dry runs
//! - `MqttSink`: MQTT client (feature `mqtt`)
//! - [`topic`]: topic naming shared by every sink

mod local;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod topic;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PublishError;

pub use local::{LocalSink, Published};

/// Message-bus client used by the [`Publisher`](crate::Publisher).
///
/// Implementations must return (not hang) so the retry timer's failure count
/// keeps moving; timeouts are the implementation's responsibility.
#[async_trait]
pub trait PublishSink: Send + Sync + 'static {
    /// Publishes `payload` on `topic`.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), PublishError>;
}

/// Shared handle to a sink.
pub type SinkRef = Arc<dyn PublishSink>;
