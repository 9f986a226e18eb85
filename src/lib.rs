//! Cooperative SIGINT handling for long-running numeric work.
//!
//! An [`InterruptGuard`](guard::InterruptGuard) owns the process's SIGINT
//! registration while a computation runs. Depending on the
//! [`InterruptPolicy`](handler::InterruptPolicy), Ctrl+C either terminates the
//! process or, after a prompt, sets a flag that the computation polls through
//! a [`CancelToken`](cancel::CancelToken) at its checkpoints.

pub mod app;
pub mod cancel;
pub mod cli;
pub mod compute;
pub mod config;
pub mod delimited;
pub mod guard;
pub mod handler;
pub mod matrix;
pub mod progress;
pub mod signal;

#[cfg(test)]
pub mod test_utils;
