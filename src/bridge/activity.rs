//! # ActivityBridge: binds the publisher to the first responsive activity source.
//!
//! ## States
//! ```text
//! Unbound ──bind() ok──► Bound { identity }      (terminal; forwards events)
//!    │
//!    └──bind() with no responder──► Unbound + RuntimeError::NoActivitySource
//! ```
//!
//! ## Rules
//! - Candidates are probed **in order**; the first that answers `current_state()` and
//!   accepts the watch registration wins.
//! - The initial state is pushed with `immediate = false` (bootstraps the first timer);
//!   every later change is pushed with `immediate = true` (preempts the cadence).
//! - The handler is one owned `Arc`, registered once; [`unbind`](ActivityBridge::unbind)
//!   cancels its delivery.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::source::{ActivityHandler, ActivityValue, SourceRef};
use crate::core::Publisher;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

/// Binding state of an [`ActivityBridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeState {
    Unbound,
    Bound { identity: String },
}

/// Forwards change notifications to the publisher as forced updates.
struct PublishOnChange {
    publisher: Arc<Publisher>,
}

impl ActivityHandler for PublishOnChange {
    fn on_change(&self, idle: bool) {
        let value = ActivityValue::from_idle(idle);
        debug!(value = %value, "activity changed");
        self.publisher.set_value(value, true);
    }
}

/// Converts activity-source events into publisher updates.
pub struct ActivityBridge {
    publisher: Arc<Publisher>,
    handler: Arc<dyn ActivityHandler>,
    bus: Bus,
    token: CancellationToken,
    state: BridgeState,
}

impl ActivityBridge {
    pub fn new(publisher: Arc<Publisher>, bus: Bus) -> Self {
        let handler = Arc::new(PublishOnChange {
            publisher: Arc::clone(&publisher),
        });
        Self {
            publisher,
            handler,
            bus,
            token: CancellationToken::new(),
            state: BridgeState::Unbound,
        }
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    /// Binds to the first responsive candidate and returns its identity.
    ///
    /// Calling `bind` again once bound returns the existing identity.
    pub async fn bind(&mut self, candidates: &[SourceRef]) -> Result<String, RuntimeError> {
        if let BridgeState::Bound { identity } = &self.state {
            return Ok(identity.clone());
        }

        let mut tried = Vec::with_capacity(candidates.len());
        for source in candidates {
            let identity = source.identity().to_string();
            tried.push(identity.clone());

            let idle = match source.current_state().await {
                Ok(idle) => idle,
                Err(e) => {
                    debug!(
                        source = %identity,
                        label = e.as_label(),
                        error = %e,
                        "activity source not responding"
                    );
                    continue;
                }
            };
            self.publisher
                .set_value(ActivityValue::from_idle(idle), false);

            let watch_token = self.token.child_token();
            if let Err(e) = source
                .watch(Arc::clone(&self.handler), watch_token.clone())
                .await
            {
                watch_token.cancel();
                debug!(
                    source = %identity,
                    label = e.as_label(),
                    error = %e,
                    "cannot watch activity source"
                );
                continue;
            }

            info!(source = %identity, "listening for events");
            self.bus
                .publish(Event::new(EventKind::SourceBound).with_subject(identity.as_str()));
            self.state = BridgeState::Bound {
                identity: identity.clone(),
            };
            return Ok(identity);
        }

        error!(critical = true, tried = ?tried, "no screensavers found to monitor");
        self.bus.publish(
            Event::new(EventKind::NoSourceFound).with_reason(format!("tried={tried:?}")),
        );
        Err(RuntimeError::NoActivitySource { tried })
    }

    /// Stops forwarding change notifications. Idempotent.
    pub fn unbind(&self) {
        self.token.cancel();
    }
}

impl Drop for ActivityBridge {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
