//! [`Driver`] over a real Chrome page via eoka.

use crate::config::BrowserConfig;
use crate::Result;
use async_trait::async_trait;
use eoka::{Browser, Page};
use popsweep_resolver::{ActionKind, Driver, DriverError, Locator};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// One match of a selector: the `index`-th visible element it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EokaElement {
    selector: String,
    index: usize,
}

impl EokaElement {
    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Chrome page driven through eoka.
///
/// Page calls are serialized, so the popup sweeper and the scenario steps
/// never interleave inside one CDP round-trip.
pub struct EokaDriver {
    browser: Mutex<Option<Browser>>,
    page: Mutex<Page>,
}

/// Rendered matches of a selector, in document order. Hidden elements
/// (`display: none`, `visibility: hidden`, detached) do not count.
const VISIBLE_JS: &str = r#"(selector) => Array.from(document.querySelectorAll(selector))
    .filter(el => el.getClientRects().length > 0 && getComputedStyle(el).visibility !== 'hidden')"#;

/// Click the nth visible match. Returns false when it no longer exists.
const CLICK_NTH_JS: &str = r#"((visible, selector, index) => {
    const el = visible(selector)[index];
    if (!el) return false;
    el.click();
    return true;
})"#;

/// Set the nth visible match's value and fire input/change. Returns false when it no longer exists.
const FILL_NTH_JS: &str = r#"((visible, selector, index, value) => {
    const el = visible(selector)[index];
    if (!el) return false;
    el.focus();
    el.value = value;
    el.dispatchEvent(new Event('input', { bubbles: true }));
    el.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
})"#;

fn quote(s: &str) -> std::result::Result<String, DriverError> {
    serde_json::to_string(s).map_err(|e| DriverError::Backend(e.to_string()))
}

fn backend(e: eoka::Error) -> DriverError {
    DriverError::Backend(e.to_string())
}

impl EokaDriver {
    /// Launch Chrome with the given browser config and open a blank page.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            config.headless, config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page: Mutex::new(page),
        })
    }

    /// Close the browser. Later page calls fail with a driver error.
    pub async fn close(&self) -> Result<()> {
        if let Some(browser) = self.browser.lock().await.take() {
            browser.close().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for EokaDriver {
    type Element = EokaElement;

    async fn navigate(&self, url: &str) -> std::result::Result<(), DriverError> {
        self.page.lock().await.goto(url).await.map_err(backend)?;
        Ok(())
    }

    async fn query(&self, locator: &Locator) -> std::result::Result<Vec<EokaElement>, DriverError> {
        let js = format!("({})({}).length", VISIBLE_JS, quote(locator.as_str())?);
        let count: usize = self.page.lock().await.evaluate(&js).await.map_err(backend)?;
        Ok((0..count)
            .map(|index| EokaElement {
                selector: locator.to_string(),
                index,
            })
            .collect())
    }

    async fn apply_action(
        &self,
        element: &EokaElement,
        action: &ActionKind,
    ) -> std::result::Result<(), DriverError> {
        let selector = quote(&element.selector)?;
        let js = match action {
            ActionKind::Click => format!(
                "{}({}, {}, {})",
                CLICK_NTH_JS, VISIBLE_JS, selector, element.index
            ),
            ActionKind::Fill { value } => format!(
                "{}({}, {}, {}, {})",
                FILL_NTH_JS,
                VISIBLE_JS,
                selector,
                element.index,
                quote(value)?
            ),
        };
        let applied: bool = self.page.lock().await.evaluate(&js).await.map_err(backend)?;
        if !applied {
            debug!(
                "'{}'[{}] vanished before {}, skipped",
                element.selector, element.index, action
            );
        }
        Ok(())
    }

    async fn wait_ms(&self, ms: u64) {
        // Not page.wait(): holding the page lock would stall the sweeper.
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn current_url(&self) -> std::result::Result<String, DriverError> {
        self.page.lock().await.url().await.map_err(backend)
    }

    async fn screenshot(&self) -> std::result::Result<Vec<u8>, DriverError> {
        self.page.lock().await.screenshot().await.map_err(backend)
    }
}
