//! # Activity event bridge.
//!
//! Turns an external "screensaver active" signal into publisher updates:
//!
//! ```text
//! candidates ──► ActivityBridge::bind()
//!                   ├─► source.current_state()   (first responder wins)
//!                   ├─► publisher.set_value(v, immediate = false)
//!                   └─► source.watch(handler)
//!                             │
//!   ActiveChanged(idle) ──────┴─► handler.on_change(idle)
//!                                   └─► publisher.set_value(v, immediate = true)
//! ```
//!
//! - [`ActivitySource`] / [`ActivityHandler`]: the collaborator seam
//! - [`ActivityValue`]: `true → inactive`, `false → active`
//! - [`ActivityBridge`]: `Unbound → Bound` state machine
//! - `dbus`: screensaver sources on the session bus (feature `dbus`)

mod activity;
#[cfg(feature = "dbus")]
pub mod dbus;
mod source;

pub use activity::{ActivityBridge, BridgeState};
pub use source::{ActivityHandler, ActivitySource, ActivityValue, SourceRef};
