//! # Retry timer states.
//!
//! ```text
//! Created ──start()──► Running ──threshold hit──► Died
//!    │                    │
//!    └──cancel()──────────┴──cancel()──► Cancelled
//! ```
//!
//! `Cancelled` and `Died` are terminal; a timer in either state is never restarted.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of one [`RetryTimer`](crate::RetryTimer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TimerState {
    Created = 0,
    Running = 1,
    Cancelled = 2,
    Died = 3,
}

impl TimerState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, TimerState::Cancelled | TimerState::Died)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerState::Created => "created",
            TimerState::Running => "running",
            TimerState::Cancelled => "cancelled",
            TimerState::Died => "died",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => TimerState::Created,
            1 => TimerState::Running,
            2 => TimerState::Cancelled,
            _ => TimerState::Died,
        }
    }
}

/// Atomic holder for a [`TimerState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(TimerState::Created as u8))
    }

    pub(crate) fn load(&self) -> TimerState {
        TimerState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves `from → to`; returns `false` if the current state is not `from`.
    pub(crate) fn transition(&self, from: TimerState, to: TimerState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
