//! # popsweep-resolver
//!
//! Poll a page for an element that may appear late or never, act on it the
//! first time it shows up, and stop. Built for dismissing cookie banners and
//! entry modals without hanging a test run when they never render.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use popsweep_resolver::{Locator, MemoryDriver, PollOptions, Resolver};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> popsweep_resolver::Result<()> {
//! let driver = Arc::new(MemoryDriver::new());
//! let resolver = Resolver::new(driver);
//!
//! let options = PollOptions::new(Duration::from_millis(2000))
//!     .with_timeout(Duration::from_secs(10));
//! let handle = resolver.resolve(Locator::new("#modal .modal-footer p")?, options)?;
//!
//! // ... drive the page meanwhile ...
//!
//! let outcome = handle.settled().await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

mod driver;
mod handle;
mod locator;
mod memory;
mod options;
mod outcome;
mod resolver;

pub use driver::{ActionKind, Driver, DriverError};
pub use handle::PollHandle;
pub use locator::Locator;
pub use memory::{AppliedAction, MemoryDriver, MemoryElement, MemoryNode};
pub use options::{PollOptions, DEFAULT_INTERVAL_MS};
pub use outcome::ActionOutcome;
pub use resolver::Resolver;

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while arming or settling a poll.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    #[error("invalid poll options: {0}")]
    InvalidOptions(String),

    #[error("resolver busy: already polling for '{active}'")]
    Busy { active: String },

    #[error("driver fault while polling for '{locator}' after {elapsed_ms}ms: {source}")]
    DriverFault {
        locator: String,
        elapsed_ms: u64,
        #[source]
        source: DriverError,
    },

    #[error("'{locator}' did not appear within {elapsed_ms}ms ({probes} probes)")]
    TimeoutExceeded {
        locator: String,
        elapsed_ms: u64,
        probes: u32,
    },

    #[error("polling for '{locator}' was cancelled after {elapsed_ms}ms ({probes} probes)")]
    Cancelled {
        locator: String,
        elapsed_ms: u64,
        probes: u32,
    },

    #[error("poll task for '{locator}' ended without settling")]
    Abandoned { locator: String },
}
