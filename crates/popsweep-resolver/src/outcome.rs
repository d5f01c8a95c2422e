use crate::{Error, Locator, Result};
use std::fmt;
use std::time::Duration;

/// Terminal state of a poll. Produced exactly once per [`PollHandle`](crate::PollHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The element was found and the action applied to it.
    FoundAndActed { probes: u32, elapsed: Duration },
    /// The deadline passed before any probe matched.
    TimedOut { probes: u32, elapsed: Duration },
    /// The handle was cancelled before any probe matched.
    Cancelled { probes: u32, elapsed: Duration },
}

impl ActionOutcome {
    /// Number of completed probes.
    pub fn probes(&self) -> u32 {
        match *self {
            Self::FoundAndActed { probes, .. }
            | Self::TimedOut { probes, .. }
            | Self::Cancelled { probes, .. } => probes,
        }
    }

    /// Time from arming to settling.
    pub fn elapsed(&self) -> Duration {
        match *self {
            Self::FoundAndActed { elapsed, .. }
            | Self::TimedOut { elapsed, .. }
            | Self::Cancelled { elapsed, .. } => elapsed,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::FoundAndActed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FoundAndActed { .. } => "found_and_acted",
            Self::TimedOut { .. } => "timed_out",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Turn anything but `FoundAndActed` into an error naming the locator.
    pub fn ensure_found(&self, locator: &Locator) -> Result<()> {
        let elapsed_ms = self.elapsed().as_millis() as u64;
        match *self {
            Self::FoundAndActed { .. } => Ok(()),
            Self::TimedOut { probes, .. } => Err(Error::TimeoutExceeded {
                locator: locator.to_string(),
                elapsed_ms,
                probes,
            }),
            Self::Cancelled { probes, .. } => Err(Error::Cancelled {
                locator: locator.to_string(),
                elapsed_ms,
                probes,
            }),
        }
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {}ms ({} probes)",
            self.label(),
            self.elapsed().as_millis(),
            self.probes()
        )
    }
}
