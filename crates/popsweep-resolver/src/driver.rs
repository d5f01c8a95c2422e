//! The browser-automation seam the resolver and suite runner drive.

use crate::Locator;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

/// Interaction applied to a found element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    #[default]
    Click,
    Fill {
        value: String,
    },
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click => f.write_str("click"),
            Self::Fill { value } => write!(f, "fill '{}'", value),
        }
    }
}

/// Faults reported by a driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// The element handle no longer refers to a live element.
    #[error("stale element: {0}")]
    StaleElement(String),

    #[error("operation not supported by this driver: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Backend(String),
}

/// Browser-automation driver.
///
/// `query` returns matches in document order. What `apply_action` does with
/// an element that vanished after `query` returned it is up to the driver:
/// it may no-op or return [`DriverError::StaleElement`].
#[async_trait]
pub trait Driver: Send + Sync {
    /// Handle to one matched element.
    type Element: Send + Sync + 'static;

    /// Navigate the page to `url`.
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Find every element matching `locator` right now.
    async fn query(&self, locator: &Locator) -> Result<Vec<Self::Element>, DriverError>;

    /// Apply `action` to a previously queried element.
    async fn apply_action(
        &self,
        element: &Self::Element,
        action: &ActionKind,
    ) -> Result<(), DriverError>;

    /// Sleep for `ms` milliseconds.
    async fn wait_ms(&self, ms: u64);

    async fn current_url(&self) -> Result<String, DriverError> {
        Err(DriverError::NotSupported("current_url".into()))
    }

    /// Capture the viewport as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        Err(DriverError::NotSupported("screenshot".into()))
    }
}
