//! Cooperative cancellation flag and the read-only token loops poll.
//!
//! The flag is set only by the interrupt handler routine and cleared only when
//! the interrupt guard is released. Computation loops see it through a
//! [`CancelToken`], which cannot mutate it.

use std::sync::atomic::{AtomicBool, Ordering};

static PROCESS_FLAG: CancelFlag = CancelFlag::new();
static NEVER_FLAG: CancelFlag = CancelFlag::new();

/// Process-wide "stop at the next checkpoint" flag.
#[derive(Debug, Default)]
pub struct CancelFlag {
    cancelled: AtomicBool,
}

impl CancelFlag {
    pub const fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
        }
    }

    /// The flag mutated by the real SIGINT handler.
    pub fn process() -> &'static CancelFlag {
        &PROCESS_FLAG
    }

    pub fn is_set(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    // Async-signal-safe: a single atomic store.
    pub(crate) fn set(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub(crate) fn clear(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn token(&'static self) -> CancelToken {
        CancelToken(self)
    }
}

/// Returned from a checkpoint when cancellation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Cancelled by interrupt")]
pub struct Cancelled;

/// Read-only view of a [`CancelFlag`], handed to long-running loops.
#[derive(Clone, Copy, Debug)]
pub struct CancelToken(&'static CancelFlag);

impl CancelToken {
    /// A token that never reports cancellation, for work run outside a guard.
    pub fn never() -> Self {
        CancelToken(&NEVER_FLAG)
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.is_set()
    }

    /// Checkpoint helper so loops can bail out with `?`.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
