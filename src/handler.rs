//! The interrupt handler routine.
//!
//! The branching is split from its side effects: [`decide`] turns a policy and
//! (for the interactive variant) one byte of input into a [`HandlerOutcome`],
//! and [`dispatch`] performs the outcome through a [`Host`]. The real SIGINT
//! handler supplies a host made only of async-signal-safe calls; tests supply
//! a scripted one.

use std::fmt;

use clap::ValueEnum;

use crate::cancel::CancelFlag;

pub const PROMPT: &str = "\nForce quit (y/n/c)? ";
pub const STOP_MESSAGE: &str = "computation stopped by SIGINT\n";

/// Exit status used when an interrupt terminates the process.
pub const TERMINATE_STATUS: i32 = 0;

/// What the handler does when SIGINT arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum InterruptPolicy {
    /// Print a message, restore the previous handler and exit immediately.
    #[default]
    Abort,
    /// Ask "Force quit (y/n/c)?" on the controlling terminal.
    /// Requires an interactive stdin.
    Prompt,
}

impl InterruptPolicy {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Abort => 0,
            Self::Prompt => 1,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Prompt,
            _ => Self::Abort,
        }
    }
}

impl fmt::Display for InterruptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => write!(f, "abort"),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// The three things a delivered interrupt can lead to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Return to the interrupted code as if nothing happened.
    Resume,
    /// Set the cancellation flag and return.
    Cancel,
    /// Report, restore the prior handler and exit the process. The abort
    /// variant reports before restoring; the answered prompt restores first.
    Terminate,
}

/// Byte-level terminal access used by the interactive prompt.
pub trait Console {
    fn write_str(&mut self, text: &str);

    /// Blocking read of a single byte. `None` on EOF or error.
    fn read_byte(&mut self) -> Option<u8>;
}

/// Irreversible operations performed for [`HandlerOutcome::Terminate`].
pub trait Host: Console {
    /// Reinstall the handler that was active before the guard was acquired.
    fn restore_prior(&mut self) -> bool;

    /// End the process. Real hosts never return from this.
    fn terminate(&mut self, status: i32);
}

/// Pick an outcome for one interrupt. Only the prompt variant does I/O.
pub fn decide<C: Console + ?Sized>(policy: InterruptPolicy, console: &mut C) -> HandlerOutcome {
    match policy {
        InterruptPolicy::Abort => {
            console.write_str("\n");
            HandlerOutcome::Terminate
        }
        InterruptPolicy::Prompt => {
            console.write_str(PROMPT);
            match console.read_byte() {
                Some(b'y') => HandlerOutcome::Terminate,
                Some(b'c') => HandlerOutcome::Cancel,
                _ => HandlerOutcome::Resume,
            }
        }
    }
}

/// Carry out an outcome reached under `policy`.
pub fn dispatch<H: Host + ?Sized>(
    policy: InterruptPolicy,
    outcome: HandlerOutcome,
    flag: &CancelFlag,
    host: &mut H,
) {
    match outcome {
        HandlerOutcome::Resume => {}
        HandlerOutcome::Cancel => flag.set(),
        HandlerOutcome::Terminate => {
            // Nothing useful can be done about a failed restore on the way out.
            match policy {
                InterruptPolicy::Abort => {
                    host.write_str(STOP_MESSAGE);
                    let _ = host.restore_prior();
                }
                InterruptPolicy::Prompt => {
                    let _ = host.restore_prior();
                    host.write_str(STOP_MESSAGE);
                }
            }
            host.terminate(TERMINATE_STATUS);
        }
    }
}

/// Full handler routine: decide, then dispatch.
pub fn respond<H: Host + ?Sized>(
    policy: InterruptPolicy,
    flag: &CancelFlag,
    host: &mut H,
) -> HandlerOutcome {
    let outcome = decide(policy, host);
    dispatch(policy, outcome, flag, host);
    outcome
}
