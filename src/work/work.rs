//! # Work abstraction.
//!
//! A [`Work`] is what a [`RetryTimer`](crate::RetryTimer) invokes: once on start,
//! then on every interval. It reports [`Outcome::Success`] or
//! [`Outcome::Failure`] and never panics or returns early through `?`;
//! the timer's failure accounting depends on every invocation producing an outcome.

use std::sync::Arc;

use async_trait::async_trait;

use super::Outcome;

/// # Asynchronous unit of recurring work.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use idle_tracker::{Outcome, Work};
///
/// struct Ping;
///
/// #[async_trait]
/// impl Work for Ping {
///     fn name(&self) -> &str { "ping" }
///
///     async fn run(&self) -> Outcome {
///         Outcome::Success
///     }
/// }
/// ```
#[async_trait]
pub trait Work: Send + Sync + 'static {
    /// Returns a stable, human-readable name used in events.
    fn name(&self) -> &str;

    /// Performs one invocation.
    async fn run(&self) -> Outcome;
}

/// Shared handle to a unit of work.
pub type WorkRef = Arc<dyn Work>;
