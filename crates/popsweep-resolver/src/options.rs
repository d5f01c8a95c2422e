use crate::{ActionKind, Error, Result};
use std::time::Duration;

/// Polling cadence used when none is configured.
pub const DEFAULT_INTERVAL_MS: u64 = 2_000;

/// How a single [`Resolver::resolve`](crate::Resolver::resolve) call polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between the end of one probe and the start of the next.
    pub interval: Duration,
    /// Upper bound on the whole poll. `None` polls until found or cancelled.
    pub timeout: Option<Duration>,
    /// Probe as soon as the poll is armed. When false the first probe
    /// happens one `interval` after arming.
    pub probe_immediately: bool,
    /// Action applied to the first match.
    pub action: ActionKind,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            timeout: None,
            probe_immediately: true,
            action: ActionKind::Click,
        }
    }
}

impl PollOptions {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_optional_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn probe_immediately(mut self, yes: bool) -> Self {
        self.probe_immediately = yes;
        self
    }

    pub fn with_action(mut self, action: ActionKind) -> Self {
        self.action = action;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::InvalidOptions("interval must be positive".into()));
        }
        if matches!(self.timeout, Some(t) if t.is_zero()) {
            return Err(Error::InvalidOptions("timeout must be positive".into()));
        }
        Ok(())
    }
}
