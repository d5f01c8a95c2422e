use crate::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Selector for the element being polled.
///
/// Opaque to the resolver; its matching rules belong to the [`Driver`](crate::Driver).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    /// Build a locator, rejecting empty or whitespace-only selectors.
    pub fn new(selector: impl Into<String>) -> Result<Self> {
        let selector = selector.into();
        if selector.trim().is_empty() {
            return Err(Error::InvalidLocator("selector must not be empty".into()));
        }
        Ok(Self(selector))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Locator {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Locator {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Locator::new(raw).map_err(serde::de::Error::custom)
    }
}
