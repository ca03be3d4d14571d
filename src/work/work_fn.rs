//! # Function-backed work (`WorkFn`)
//!
//! [`WorkFn`] wraps a closure `F: Fn() -> Fut`, producing a fresh future per
//! invocation. State shared between invocations lives in an explicit `Arc`
//! captured by the closure.
//!
//! ## Example
//! ```rust
//! use idle_tracker::{Outcome, WorkFn, WorkRef};
//!
//! let w: WorkRef = WorkFn::arc("noop", || async { Outcome::Success });
//! assert_eq!(w.name(), "noop");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::{Outcome, Work};

/// Function-backed work implementation.
#[derive(Debug)]
pub struct WorkFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WorkFn<F> {
    /// Creates new function-backed work.
    ///
    /// Prefer [`WorkFn::arc`] when you immediately need a [`WorkRef`](crate::WorkRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the work and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Work for WorkFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> Outcome {
        (self.f)().await
    }
}
