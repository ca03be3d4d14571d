//! # Activity source seam.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::SourceError;

/// Payload published for a user's activity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityValue {
    Active,
    Inactive,
}

impl ActivityValue {
    /// Maps the screensaver state: an active screensaver means an idle user.
    ///
    /// ```
    /// use idle_tracker::ActivityValue;
    ///
    /// assert_eq!(ActivityValue::from_idle(true).as_str(), "inactive");
    /// assert_eq!(ActivityValue::from_idle(false).as_str(), "active");
    /// ```
    pub fn from_idle(idle: bool) -> Self {
        if idle {
            ActivityValue::Inactive
        } else {
            ActivityValue::Active
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityValue::Active => "active",
            ActivityValue::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ActivityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ActivityValue> for Arc<str> {
    fn from(v: ActivityValue) -> Self {
        Arc::from(v.as_str())
    }
}

/// Receiver of activity change notifications.
///
/// Called from the source's notification context; implementations must not block.
pub trait ActivityHandler: Send + Sync + 'static {
    fn on_change(&self, idle: bool);
}

/// Something that knows whether the user is idle and announces changes.
#[async_trait]
pub trait ActivitySource: Send + Sync + 'static {
    /// Identity this source answers at (e.g. a D-Bus service name).
    fn identity(&self) -> &str;

    /// Current state; `true` means idle. An error means the source did not respond.
    async fn current_state(&self) -> Result<bool, SourceError>;

    /// Registers `handler` for change notifications until `token` is cancelled.
    ///
    /// Returns once registration succeeded; delivery continues in the background.
    async fn watch(
        &self,
        handler: Arc<dyn ActivityHandler>,
        token: CancellationToken,
    ) -> Result<(), SourceError>;
}

/// Shared handle to an activity source.
pub type SourceRef = Arc<dyn ActivitySource>;
