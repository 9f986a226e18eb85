//! Shared test doubles for the signal backend and the handler host.

use std::cell::RefCell;
use std::collections::VecDeque;

use log::{Level, LevelFilter, Log, Metadata, Record};
use nix::errno::Errno;

use crate::cancel::CancelFlag;
use crate::handler::{Console, Host, InterruptPolicy};
use crate::matrix::{DataOrder, Matrix};
use crate::signal::{SignalError, SignalOps};

/// In-memory stand-in for the OS registration table.
///
/// Registrations are identified by number: the process starts with
/// [`MockSignals::SENTINEL`] installed and the guard installs
/// [`MockSignals::OURS`].
pub struct MockSignals {
    pub current: u32,
    pub installs: Vec<InterruptPolicy>,
    pub restores: usize,
    pub fail_install: bool,
    pub fail_restore: bool,
    /// Simulate Ctrl+C answered with `c` right after installation.
    pub cancel_on_install: bool,
    flag: &'static CancelFlag,
}

impl MockSignals {
    pub const SENTINEL: u32 = 1;
    pub const OURS: u32 = 2;

    pub fn new() -> Self {
        Self {
            current: Self::SENTINEL,
            installs: Vec::new(),
            restores: 0,
            fail_install: false,
            fail_restore: false,
            cancel_on_install: false,
            flag: Box::leak(Box::new(CancelFlag::new())),
        }
    }

    pub fn is_ours_installed(&self) -> bool {
        self.current == Self::OURS
    }
}

impl SignalOps for MockSignals {
    type Saved = u32;

    fn install(&mut self, policy: InterruptPolicy) -> Result<u32, SignalError> {
        if self.fail_install {
            return Err(SignalError::Install(Errno::EINVAL));
        }
        self.installs.push(policy);
        let prior = self.current;
        self.current = Self::OURS;
        if self.cancel_on_install {
            self.flag.set();
        }
        Ok(prior)
    }

    fn restore(&mut self, prior: &u32) -> Result<(), SignalError> {
        self.restores += 1;
        if self.fail_restore {
            return Err(SignalError::Restore(Errno::EINVAL));
        }
        self.current = *prior;
        Ok(())
    }

    fn flag(&self) -> &'static CancelFlag {
        self.flag
    }
}

/// Handler host that replays scripted keystrokes and records side effects.
pub struct ScriptedHost {
    input: VecDeque<u8>,
    pub output: String,
    pub reads: usize,
    pub restores: usize,
    /// Length of `output` when the prior handler was last restored.
    pub restored_at: Option<usize>,
    pub terminations: Vec<i32>,
}

impl ScriptedHost {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: String::new(),
            reads: 0,
            restores: 0,
            restored_at: None,
            terminations: Vec::new(),
        }
    }
}

impl Console for ScriptedHost {
    fn write_str(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.reads += 1;
        self.input.pop_front()
    }
}

impl Host for ScriptedHost {
    fn restore_prior(&mut self) -> bool {
        self.restores += 1;
        self.restored_at = Some(self.output.len());
        true
    }

    fn terminate(&mut self, status: i32) {
        self.terminations.push(status);
    }
}

thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Logger that keeps records per thread, so parallel tests see only their own.
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED.with(|c| c.borrow_mut().push((record.level(), record.args().to_string())));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Run `f` and return what it logged on this thread.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, Vec<(Level, String)>) {
    // Already installed by an earlier test on another thread.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Trace);
    CAPTURED.with(|c| c.borrow_mut().clear());
    let value = f();
    let records = CAPTURED.with(|c| c.take());
    (value, records)
}

/// A fresh flag not shared with any other test.
pub fn leaked_flag() -> &'static CancelFlag {
    Box::leak(Box::new(CancelFlag::new()))
}

/// Build a row-major `f64` matrix from literal rows.
pub fn make_matrix(rows: &[&[f64]]) -> Matrix<f64> {
    let rows: Vec<Vec<f64>> = rows.iter().map(|r| r.to_vec()).collect();
    Matrix::from_rows(rows, DataOrder::RowMajor).expect("rows must be rectangular")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_signals_round_trip() {
        let mut signals = MockSignals::new();
        let prior = signals.install(InterruptPolicy::Abort).unwrap();
        assert!(signals.is_ours_installed());
        signals.restore(&prior).unwrap();
        assert_eq!(signals.current, MockSignals::SENTINEL);
    }

    #[test]
    fn test_scripted_host_runs_dry() {
        let mut host = ScriptedHost::new(b"y");
        assert_eq!(host.read_byte(), Some(b'y'));
        assert_eq!(host.read_byte(), None);
        assert_eq!(host.reads, 2);
    }
}
