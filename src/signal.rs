//! SIGINT registration through `sigaction(2)`.
//!
//! [`SignalOps`] is the seam between the guard's state machine and the OS.
//! [`NixSignals`] is the real backend: it installs [`on_interrupt`] and hands
//! back the prior `SigAction` (handler, mask and flags) so it can be
//! reinstalled verbatim.
//!
//! The handler itself may only use async-signal-safe operations. Everything
//! it needs (policy, console descriptors, the prior action) is published in a
//! static slot before SIGINT is unblocked, and console I/O goes straight
//! through `read(2)`/`write(2)`.

use std::cell::UnsafeCell;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};

use log::error;
use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};

use crate::cancel::CancelFlag;
use crate::handler::{self, Console, Host, InterruptPolicy};

/// Errors from signal registration
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("Failed to change the SIGINT mask: {0}")]
    Mask(Errno),
    #[error("Failed to install the SIGINT handler: {0}")]
    Install(Errno),
    #[error("Failed to restore the previous SIGINT handler: {0}")]
    Restore(Errno),
}

/// Trait for SIGINT registration - allows mocking in tests
pub trait SignalOps {
    /// Whatever is needed to put the previous registration back.
    type Saved;

    /// Install the interrupt handler for `policy`, returning the registration
    /// it replaced.
    fn install(&mut self, policy: InterruptPolicy) -> Result<Self::Saved, SignalError>;

    /// Reinstall a registration previously returned by `install`.
    fn restore(&mut self, prior: &Self::Saved) -> Result<(), SignalError>;

    /// The flag the installed handler sets on "cancel".
    fn flag(&self) -> &'static CancelFlag;
}

/// State shared with the signal handler.
///
/// `action` is written only while SIGINT is blocked on the writing thread and
/// `armed` is false; the handler reads it only after observing `armed`.
struct HandlerSlot {
    armed: AtomicBool,
    policy: AtomicU8,
    input: AtomicI32,
    output: AtomicI32,
    action: UnsafeCell<Option<SigAction>>,
}

// SAFETY: see the access protocol on `HandlerSlot`.
unsafe impl Sync for HandlerSlot {}

impl HandlerSlot {
    const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            policy: AtomicU8::new(0),
            input: AtomicI32::new(libc::STDIN_FILENO),
            output: AtomicI32::new(libc::STDERR_FILENO),
            action: UnsafeCell::new(None),
        }
    }

    fn publish(&self, prior: SigAction) {
        // SAFETY: SIGINT is blocked on this thread and `armed` is false.
        unsafe { *self.action.get() = Some(prior) };
        self.armed.store(true, Ordering::Release);
    }

    fn retract(&self) {
        self.armed.store(false, Ordering::Release);
        // SAFETY: as for `publish`.
        unsafe { *self.action.get() = None };
    }

    fn prior(&self) -> Option<SigAction> {
        if !self.armed.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: published before `armed` was set.
        unsafe { *self.action.get() }
    }
}

static SLOT: HandlerSlot = HandlerSlot::new();
static CLAIMED: AtomicBool = AtomicBool::new(false);

/// The SIGINT handler installed while a guard is held.
extern "C" fn on_interrupt(_signum: libc::c_int) {
    let policy = InterruptPolicy::from_u8(SLOT.policy.load(Ordering::Acquire));
    let mut host = SignalHost {
        input: SLOT.input.load(Ordering::Acquire),
        output: SLOT.output.load(Ordering::Acquire),
    };
    handler::respond(policy, CancelFlag::process(), &mut host);
}

/// Host made of async-signal-safe calls only.
struct SignalHost {
    input: RawFd,
    output: RawFd,
}

impl Console for SignalHost {
    fn write_str(&mut self, text: &str) {
        let mut bytes = text.as_bytes();
        while !bytes.is_empty() {
            // SAFETY: valid pointer and length for the duration of the call.
            let written = unsafe { libc::write(self.output, bytes.as_ptr().cast(), bytes.len()) };
            if written <= 0 {
                return;
            }
            bytes = &bytes[written as usize..];
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut byte = 0u8;
        // SAFETY: reads at most one byte into a local.
        let read = unsafe { libc::read(self.input, (&mut byte as *mut u8).cast(), 1) };
        (read == 1).then_some(byte)
    }
}

impl Host for SignalHost {
    fn restore_prior(&mut self) -> bool {
        match SLOT.prior() {
            // SAFETY: reinstalling a registration the kernel handed us.
            Some(prior) => unsafe { signal::sigaction(Signal::SIGINT, &prior) }.is_ok(),
            None => false,
        }
    }

    fn terminate(&mut self, status: i32) {
        // SAFETY: `_exit` is async-signal-safe; `exit` is not.
        unsafe { libc::_exit(status) }
    }
}

/// Runs `f` with SIGINT blocked on the calling thread.
fn with_sigint_blocked<T>(f: impl FnOnce() -> T) -> Result<T, SignalError> {
    let mut block = SigSet::empty();
    block.add(Signal::SIGINT);
    let previous = block
        .thread_swap_mask(SigmaskHow::SIG_BLOCK)
        .map_err(SignalError::Mask)?;
    let value = f();
    previous.thread_set_mask().map_err(SignalError::Mask)?;
    Ok(value)
}

/// The real SIGINT backend. Only one may exist at a time.
#[derive(Debug)]
pub struct NixSignals {
    input: RawFd,
    output: RawFd,
}

impl NixSignals {
    /// Claim the process's SIGINT registration. `None` if already claimed.
    pub fn claim() -> Option<Self> {
        CLAIMED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                input: libc::STDIN_FILENO,
                output: libc::STDERR_FILENO,
            })
    }

    /// Use other descriptors for the interactive prompt.
    pub fn with_console(mut self, input: RawFd, output: RawFd) -> Self {
        self.input = input;
        self.output = output;
        self
    }
}

impl Drop for NixSignals {
    fn drop(&mut self) {
        if !unclaim(&SLOT, &CLAIMED) {
            error!("SIGINT handler still installed; keeping the claim so the prior handler is not lost");
        }
    }
}

/// Give up the claim unless our handler is still armed: a later backend would
/// otherwise save `on_interrupt` as its prior registration.
fn unclaim(slot: &HandlerSlot, claimed: &AtomicBool) -> bool {
    if slot.armed.load(Ordering::Acquire) {
        return false;
    }
    claimed.store(false, Ordering::SeqCst);
    true
}

impl SignalOps for NixSignals {
    type Saved = SigAction;

    fn install(&mut self, policy: InterruptPolicy) -> Result<SigAction, SignalError> {
        SLOT.policy.store(policy.as_u8(), Ordering::Release);
        SLOT.input.store(self.input, Ordering::Release);
        SLOT.output.store(self.output, Ordering::Release);

        let ours = SigAction::new(
            SigHandler::Handler(on_interrupt),
            SaFlags::empty(),
            SigSet::empty(),
        );
        with_sigint_blocked(|| -> Result<SigAction, SignalError> {
            // SAFETY: `on_interrupt` only performs async-signal-safe work.
            let prior = unsafe { signal::sigaction(Signal::SIGINT, &ours) }
                .map_err(SignalError::Install)?;
            SLOT.publish(prior);
            Ok(prior)
        })?
    }

    fn restore(&mut self, prior: &SigAction) -> Result<(), SignalError> {
        with_sigint_blocked(|| -> Result<(), SignalError> {
            // SAFETY: reinstalling the registration `install` replaced.
            unsafe { signal::sigaction(Signal::SIGINT, prior) }.map_err(SignalError::Restore)?;
            SLOT.retract();
            Ok(())
        })?
    }

    fn flag(&self) -> &'static CancelFlag {
        CancelFlag::process()
    }
}
