//! The interrupt guard: owns the SIGINT registration for the duration of a
//! computation.
//!
//! States are inactive (no saved registration) and active (saved registration
//! present). Acquiring while active and releasing while inactive are refused
//! without side effects, so the guard never loses track of which registration
//! to put back.

use log::{debug, error, warn};

use crate::cancel::{CancelFlag, CancelToken};
use crate::handler::InterruptPolicy;
use crate::signal::{SignalError, SignalOps};

/// Errors from guard transitions
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Interrupt guard is already held")]
    AlreadyActive,
    #[error("Interrupt guard is not held")]
    NotActive,
    #[error(transparent)]
    Signal(#[from] SignalError),
}

impl GuardError {
    /// SIGINT disposition can no longer be trusted after a failed restore.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Signal(SignalError::Restore(_)))
    }
}

pub struct InterruptGuard<S: SignalOps> {
    signals: S,
    policy: InterruptPolicy,
    flag: &'static CancelFlag,
    saved: Option<S::Saved>,
}

impl<S: SignalOps> InterruptGuard<S> {
    pub fn new(signals: S, policy: InterruptPolicy) -> Self {
        let flag = signals.flag();
        Self {
            signals,
            policy,
            flag,
            saved: None,
        }
    }

    pub fn policy(&self) -> InterruptPolicy {
        self.policy
    }

    pub fn is_active(&self) -> bool {
        self.saved.is_some()
    }

    /// Read-only view of the cancellation flag.
    pub fn token(&self) -> CancelToken {
        self.flag.token()
    }

    /// Install the interrupt handler and remember the one it replaces.
    pub fn acquire(&mut self) -> Result<(), GuardError> {
        if self.is_active() {
            return Err(GuardError::AlreadyActive);
        }

        match self.signals.install(self.policy) {
            Ok(prior) => {
                self.saved = Some(prior);
                debug!("Interrupt guard acquired (policy: {})", self.policy);
                Ok(())
            }
            Err(e) => {
                self.clear();
                Err(e.into())
            }
        }
    }

    /// Put the previous handler back and clear the cancellation flag.
    ///
    /// If the OS refuses the restore the guard stays active; the error is
    /// fatal (see [`GuardError::is_fatal`]).
    pub fn release(&mut self) -> Result<(), GuardError> {
        let prior = self.saved.as_ref().ok_or(GuardError::NotActive)?;
        self.signals.restore(prior)?;
        self.clear();
        debug!("Interrupt guard released");
        Ok(())
    }

    /// Acquire for the lifetime of the returned value.
    pub fn hold(&mut self) -> Result<Held<'_, S>, GuardError> {
        self.acquire()?;
        Ok(Held {
            guard: self,
            released: false,
        })
    }

    /// Run `f` under the guard, releasing on every exit path.
    pub fn run<T>(&mut self, f: impl FnOnce(CancelToken) -> T) -> Result<T, GuardError> {
        let held = self.hold()?;
        let value = f(held.token());
        held.release()?;
        Ok(value)
    }

    fn clear(&mut self) {
        self.flag.clear();
        self.saved = None;
    }

    /// Route an interrupt through the handler routine as the OS would.
    #[cfg(test)]
    pub(crate) fn deliver<H: crate::handler::Host>(
        &self,
        host: &mut H,
    ) -> Option<crate::handler::HandlerOutcome> {
        self.is_active()
            .then(|| crate::handler::respond(self.policy, self.flag, host))
    }

    #[cfg(test)]
    pub(crate) fn signals(&self) -> &S {
        &self.signals
    }

    #[cfg(test)]
    pub(crate) fn signals_mut(&mut self) -> &mut S {
        &mut self.signals
    }
}

impl<S: SignalOps> Drop for InterruptGuard<S> {
    fn drop(&mut self) {
        if self.is_active() {
            if let Err(e) = self.release() {
                error!("Error uninitializing signal handler: {}", e);
            }
        }
    }
}

/// Scoped hold on an [`InterruptGuard`]; releases when dropped.
pub struct Held<'a, S: SignalOps> {
    guard: &'a mut InterruptGuard<S>,
    released: bool,
}

impl<S: SignalOps> Held<'_, S> {
    pub fn token(&self) -> CancelToken {
        self.guard.token()
    }

    /// Release now, surfacing a failed restore instead of only logging it.
    pub fn release(mut self) -> Result<(), GuardError> {
        self.released = true;
        self.guard.release()
    }
}

impl<S: SignalOps> Drop for Held<'_, S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.guard.release() {
            if e.is_fatal() {
                error!("Failed to release interrupt guard: {}", e);
            } else {
                warn!("Failed to release interrupt guard: {}", e);
            }
        }
    }
}
