//! # Units of recurring work.
//!
//! - [`Work`] - trait for one async invocation returning an [`Outcome`]
//! - [`WorkFn`] - closure-backed implementation
//! - [`WorkRef`] - shared reference to work (`Arc<dyn Work>`)

mod outcome;
mod work;
mod work_fn;

pub use outcome::Outcome;
pub use work::{Work, WorkRef};
pub use work_fn::WorkFn;
