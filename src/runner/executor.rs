use super::hooks;
use crate::config::Step;
use crate::{Error, Result};
use popsweep_resolver::{ActionKind, Driver, PollHandle};
use rand::seq::SliceRandom;
use tracing::{debug, info};

/// Per-attempt state shared by the steps of a scenario.
#[derive(Clone, Default)]
pub(crate) struct ExecutionContext {
    /// Prefix for relative URLs.
    pub base_url: Option<String>,
    /// The popup sweeper running alongside the steps, if any.
    pub dismissal: Option<PollHandle>,
}

impl ExecutionContext {
    pub fn new(base_url: Option<String>, dismissal: Option<PollHandle>) -> Self {
        Self {
            base_url,
            dismissal,
        }
    }

    /// Join a relative URL onto the base URL.
    pub fn resolve_url(&self, url: &str) -> String {
        let absolute =
            url.contains("://") || url.starts_with("about:") || url.starts_with("data:");
        match self.base_url.as_deref() {
            Some(base) if !absolute => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                url.trim_start_matches('/')
            ),
            _ => url.to_string(),
        }
    }
}

/// Execute a single step against the driver.
pub(crate) async fn execute<D: Driver>(
    driver: &D,
    step: &Step,
    ctx: &ExecutionContext,
) -> Result<()> {
    match step {
        Step::Visit(s) => {
            let url = ctx.resolve_url(&s.url);
            info!("visit: {}", url);
            driver.navigate(&url).await?;
        }
        Step::VisitAny(s) => {
            let picked = {
                let mut rng = rand::thread_rng();
                s.urls.choose(&mut rng).cloned()
            };
            let picked = picked
                .ok_or_else(|| Error::StepFailed("visit_any has no urls".into()))?;
            let url = ctx.resolve_url(&picked);
            info!("visit_any: {} (of {})", url, s.urls.len());
            driver.navigate(&url).await?;
        }
        Step::Wait(s) => {
            let ms = s.duration_ms();
            info!("Waiting {}ms", ms);
            driver.wait_ms(ms).await;
            info!("Finished waiting");
        }
        Step::SettlePopup(s) => match ctx.dismissal {
            Some(ref handle) => {
                debug!("settle_popup: joining sweep for '{}'", handle.locator());
                hooks::join(handle, s.required).await?;
            }
            None => debug!("settle_popup: no sweeper armed"),
        },
        Step::Click(s) => {
            debug!("click: {}", s.selector);
            let found = driver.query(&s.selector).await?;
            let first = found
                .first()
                .ok_or_else(|| Error::StepFailed(format!("click: no element matches '{}'", s.selector)))?;
            driver.apply_action(first, &ActionKind::Click).await?;
        }
        Step::TryClick(s) => {
            debug!("try_click: {}", s.selector);
            match driver.query(&s.selector).await {
                Ok(found) => match found.first() {
                    Some(first) => {
                        if let Err(e) = driver.apply_action(first, &ActionKind::Click).await {
                            debug!("try_click: '{}' ignored: {}", s.selector, e);
                        }
                    }
                    None => debug!("try_click: '{}' not present", s.selector),
                },
                Err(e) => debug!("try_click: '{}' ignored: {}", s.selector, e),
            }
        }
        Step::Fill(s) => {
            debug!("fill: {}", s.selector);
            let found = driver.query(&s.selector).await?;
            let first = found
                .first()
                .ok_or_else(|| Error::StepFailed(format!("fill: no element matches '{}'", s.selector)))?;
            let action = ActionKind::Fill {
                value: s.value.clone(),
            };
            driver.apply_action(first, &action).await?;
        }
        Step::AssertPresent(s) => {
            debug!("assert_present: {}", s.selector);
            if driver.query(&s.selector).await?.is_empty() {
                return Err(Error::AssertionFailed(format!(
                    "expected '{}' to be present",
                    s.selector
                )));
            }
        }
        Step::AssertAbsent(s) => {
            debug!("assert_absent: {}", s.selector);
            let count = driver.query(&s.selector).await?.len();
            if count > 0 {
                return Err(Error::AssertionFailed(format!(
                    "expected '{}' to be absent, found {}",
                    s.selector, count
                )));
            }
        }
        Step::AssertUrl(s) => {
            let url = driver.current_url().await?;
            debug!("assert_url: '{}' in {}", s.contains, url);
            if !url.contains(&s.contains) {
                return Err(Error::AssertionFailed(format!(
                    "expected url to contain '{}', got {}",
                    s.contains, url
                )));
            }
        }
        Step::Log(s) => {
            info!("[log] {}", s.message);
        }
        Step::Repeat(r) => {
            debug!("repeat: {} times", r.times);
            for _ in 0..r.times {
                for step in &r.steps {
                    Box::pin(execute(driver, step, ctx)).await?;
                }
            }
        }
    }
    Ok(())
}
