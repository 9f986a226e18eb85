//! Interrupt configuration.
//!
//! The handler policy can be configured via:
//! - CLI: `--interrupt abort|prompt`
//! - Environment: `CANCELGUARD_INTERRUPT=abort|prompt`
//!
//! CLI arguments take precedence over environment variables. The prompt
//! policy needs an interactive stdin and is downgraded to abort otherwise.

use std::env;
use std::io::IsTerminal;

use clap::ValueEnum;
use log::warn;

use crate::handler::InterruptPolicy;

pub const POLICY_ENV: &str = "CANCELGUARD_INTERRUPT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterruptConfig {
    pub policy: InterruptPolicy,
}

impl InterruptConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config from `CANCELGUARD_INTERRUPT`.
    pub fn from_env() -> Self {
        Self::from_value(env::var(POLICY_ENV).ok().as_deref())
    }

    fn from_value(value: Option<&str>) -> Self {
        let mut config = Self::new();
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            match InterruptPolicy::from_str(value, true) {
                Ok(policy) => config.policy = policy,
                Err(_) => warn!("Unknown interrupt policy '{}' in {}", value, POLICY_ENV),
            }
        }
        config
    }

    pub fn with_policy(mut self, policy: InterruptPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Merge with CLI overrides. CLI values take precedence.
    pub fn with_overrides(mut self, policy: Option<InterruptPolicy>) -> Self {
        if let Some(p) = policy {
            self.policy = p;
        }
        self
    }

    /// Fall back to abort when nobody can answer the prompt.
    pub fn resolve(self, interactive: bool) -> Self {
        if self.policy == InterruptPolicy::Prompt && !interactive {
            warn!("stdin is not a terminal, interrupts will abort instead of prompting");
            return self.with_policy(InterruptPolicy::Abort);
        }
        self
    }

    /// [`resolve`](Self::resolve) against the real stdin.
    pub fn resolve_for_stdin(self) -> Self {
        self.resolve(std::io::stdin().is_terminal())
    }
}
