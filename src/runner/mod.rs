mod executor;
mod hooks;

use crate::browser::EokaDriver;
use crate::config::{BrowserConfig, Config, HookScope, Scenario};
use crate::{Error, Result};
use executor::ExecutionContext;
use hooks::{DismissHook, SuiteSweep};
use popsweep_resolver::{ActionOutcome, Driver, Resolver};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of one scenario.
#[derive(Debug)]
pub struct ScenarioReport {
    pub name: String,
    /// Whether the scenario succeeded.
    pub success: bool,
    /// Error message if failed.
    pub error: Option<String>,
    /// Number of steps executed in the last attempt.
    pub steps_executed: usize,
    /// Duration in milliseconds, retries included.
    pub duration_ms: u64,
    /// Number of retry attempts made.
    pub retries: u32,
    /// How the popup sweeper ended, if one ran and settled.
    pub dismissal: Option<ActionOutcome>,
}

/// Result of a whole config.
#[derive(Debug)]
pub struct SuiteReport {
    pub name: String,
    pub scenarios: Vec<ScenarioReport>,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
    /// Failure outside any one scenario (suite-wide sweeper).
    pub error: Option<String>,
}

impl SuiteReport {
    pub fn success(&self) -> bool {
        self.error.is_none() && self.scenarios.iter().all(|s| s.success)
    }

    pub fn failed(&self) -> usize {
        self.scenarios.iter().filter(|s| !s.success).count()
    }
}

/// State of one attempt at a scenario.
struct Attempt {
    steps_executed: usize,
    dismissal: Option<ActionOutcome>,
    result: Result<()>,
}

/// Runs configs against a driver, with the popup sweeper alongside.
pub struct Runner<D: Driver + 'static> {
    resolver: Resolver<D>,
}

impl Runner<EokaDriver> {
    /// Launch Chrome and create a runner on it.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let driver = EokaDriver::launch(config).await?;
        Ok(Self::new(Arc::new(driver)))
    }

    /// Stop any sweep and close the browser.
    pub async fn close(self) -> Result<()> {
        let driver = Arc::clone(self.driver());
        drop(self);
        driver.close().await
    }
}

impl<D: Driver + 'static> Runner<D> {
    pub fn new(driver: Arc<D>) -> Self {
        Self {
            resolver: Resolver::new(driver),
        }
    }

    pub fn driver(&self) -> &Arc<D> {
        self.resolver.driver()
    }

    pub fn resolver(&self) -> &Resolver<D> {
        &self.resolver
    }

    /// Run every scenario in order.
    pub async fn run(&self, config: &Config) -> Result<SuiteReport> {
        let start = Instant::now();
        info!("Running suite: {}", config.name);

        let hook = config.dismiss.as_ref().map(DismissHook::new);
        let suite_hook = hook.as_ref().filter(|h| h.scope() == HookScope::Suite);
        let suite_sweep = match suite_hook {
            Some(h) => Some(SuiteSweep::new(h.arm(&self.resolver)?)),
            None => None,
        };

        let mut scenarios = Vec::with_capacity(config.scenarios.len());
        for scenario in &config.scenarios {
            let report = self
                .run_scenario(config, scenario, hook.as_ref(), suite_sweep.as_ref())
                .await;
            scenarios.push(report);
        }

        let mut error = None;
        if let (Some(h), Some(sweep)) = (suite_hook, suite_sweep.as_ref()) {
            let steps_ok = scenarios.iter().all(|s| s.success);
            if let Err(e) = h.teardown(sweep.handle(), steps_ok).await {
                warn!("Suite sweeper failed: {}", e);
                error = Some(e.to_string());
            }
        }

        Ok(SuiteReport {
            name: config.name.clone(),
            scenarios,
            duration_ms: start.elapsed().as_millis() as u64,
            error,
        })
    }

    /// Run one scenario with retry support.
    async fn run_scenario(
        &self,
        config: &Config,
        scenario: &Scenario,
        hook: Option<&DismissHook<'_>>,
        suite_sweep: Option<&SuiteSweep>,
    ) -> ScenarioReport {
        let start = Instant::now();
        let retry_config = config.on_failure.as_ref().and_then(|f| f.retry.as_ref());
        let max_attempts = retry_config.map(|r| r.attempts).unwrap_or(1);
        let retry_delay = retry_config.map(|r| r.delay_ms).unwrap_or(0);

        info!("Scenario: {}", scenario.name);
        let mut retries = 0;
        let mut last = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                retries += 1;
                info!("Retry attempt {}/{}", attempt, max_attempts);
                if retry_delay > 0 {
                    tokio::time::sleep(Duration::from_millis(retry_delay)).await;
                }
            }

            let outcome = self.run_attempt(config, scenario, hook, suite_sweep).await;
            match outcome.result {
                Ok(()) => {
                    return ScenarioReport {
                        name: scenario.name.clone(),
                        success: true,
                        error: None,
                        steps_executed: outcome.steps_executed,
                        duration_ms: start.elapsed().as_millis() as u64,
                        retries,
                        dismissal: outcome.dismissal,
                    };
                }
                Err(ref e) => {
                    warn!("Attempt {} of '{}' failed: {}", attempt, scenario.name, e);
                }
            }
            last = Some(outcome);
        }

        self.handle_failure(config, scenario).await;

        let (steps_executed, dismissal, error) = match last {
            Some(a) => (
                a.steps_executed,
                a.dismissal,
                a.result.err().map(|e| e.to_string()),
            ),
            None => (0, None, None),
        };
        ScenarioReport {
            name: scenario.name.clone(),
            success: false,
            error,
            steps_executed,
            duration_ms: start.elapsed().as_millis() as u64,
            retries,
            dismissal,
        }
    }

    async fn run_attempt(
        &self,
        config: &Config,
        scenario: &Scenario,
        hook: Option<&DismissHook<'_>>,
        suite_sweep: Option<&SuiteSweep>,
    ) -> Attempt {
        let sweep = match (hook, suite_sweep) {
            (_, Some(shared)) => Some(shared.handle().clone()),
            (Some(h), None) => match h.arm(&self.resolver) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    return Attempt {
                        steps_executed: 0,
                        dismissal: None,
                        result: Err(e),
                    }
                }
            },
            (None, None) => None,
        };

        let ctx = ExecutionContext::new(config.base_url.clone(), sweep.clone());
        let mut steps_executed = 0;
        let mut result = async {
            if let (Some(h), Some(handle)) = (hook, sweep.as_ref()) {
                h.before_steps(handle).await?;
            }
            for (i, step) in scenario.steps.iter().enumerate() {
                debug!("Executing step {}: {}", i + 1, step.name());
                executor::execute(self.driver().as_ref(), step, &ctx).await?;
                steps_executed += 1;
            }
            Ok::<(), Error>(())
        }
        .await;

        match (hook, sweep.as_ref()) {
            (Some(h), Some(handle)) if suite_sweep.is_none() => {
                let teardown = h.teardown(handle, result.is_ok()).await;
                if result.is_ok() {
                    result = teardown.map(|_| ());
                }
            }
            _ => {
                if let Some(shared) = suite_sweep {
                    let fault = shared.take_fault();
                    if result.is_ok() {
                        result = fault;
                    }
                }
            }
        }

        let dismissal = sweep.and_then(|h| h.outcome()).and_then(|o| o.ok());
        Attempt {
            steps_executed,
            dismissal,
            result,
        }
    }

    async fn handle_failure(&self, config: &Config, scenario: &Scenario) {
        let Some(template) = config.on_failure.as_ref().and_then(|f| f.screenshot.as_ref()) else {
            return;
        };
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let path = template
            .replace("{timestamp}", &timestamp)
            .replace("{scenario}", &slug(&scenario.name));
        info!("Saving failure screenshot to: {}", path);
        match self.driver().screenshot().await {
            Ok(data) => {
                if let Err(e) = std::fs::write(&path, data) {
                    warn!("Failed to save screenshot: {}", e);
                }
            }
            Err(e) => warn!("Failed to take screenshot: {}", e),
        }
    }
}

/// File-name-safe version of a scenario name.
fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}
