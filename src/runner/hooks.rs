use crate::config::{DismissConfig, HookScope, JoinPoint};
use crate::Result;
use popsweep_resolver::{ActionOutcome, Driver, PollHandle, Resolver};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Setup/teardown pair around the popup sweeper.
pub(crate) struct DismissHook<'a> {
    config: &'a DismissConfig,
}

impl<'a> DismissHook<'a> {
    pub fn new(config: &'a DismissConfig) -> Self {
        Self { config }
    }

    pub fn scope(&self) -> HookScope {
        self.config.scope
    }

    /// Start sweeping for the popup in the background.
    pub fn arm<D: Driver + 'static>(&self, resolver: &Resolver<D>) -> Result<PollHandle> {
        info!(
            "Sweeping for popup '{}' every {}ms",
            self.config.locator, self.config.interval_ms
        );
        Ok(resolver.resolve(self.config.locator.clone(), self.config.poll_options())?)
    }

    /// Hold the steps back until the sweeper settles, when configured to.
    pub async fn before_steps(&self, handle: &PollHandle) -> Result<()> {
        if self.config.join == JoinPoint::BeforeSteps {
            debug!("Waiting for popup sweeper before steps");
            join(handle, self.config.required).await?;
        }
        Ok(())
    }

    /// Finish the sweeper after the steps ran.
    ///
    /// A required popup is awaited until it is clicked or the deadline
    /// passes; otherwise the sweep is cancelled.
    pub async fn teardown(&self, handle: &PollHandle, steps_ok: bool) -> Result<ActionOutcome> {
        if self.config.required && steps_ok {
            return join(handle, true).await;
        }
        Ok(handle.cancel_and_settle().await?)
    }
}

/// Wait for `handle` to settle. Faults always propagate; a popup that never
/// showed up only fails when `required`.
pub(crate) async fn join(handle: &PollHandle, required: bool) -> Result<ActionOutcome> {
    let outcome = handle.settled().await?;
    if required {
        outcome.ensure_found(handle.locator())?;
    } else if !outcome.is_found() {
        info!("Popup '{}' not shown: {}", handle.locator(), outcome);
    }
    Ok(outcome)
}

/// A sweeper armed once for the whole suite.
pub(crate) struct SuiteSweep {
    handle: PollHandle,
    fault_reported: AtomicBool,
}

impl SuiteSweep {
    pub fn new(handle: PollHandle) -> Self {
        Self {
            handle,
            fault_reported: AtomicBool::new(false),
        }
    }

    pub fn handle(&self) -> &PollHandle {
        &self.handle
    }

    /// Surface a sweep fault to the first scenario that observes it. Later
    /// scenarios run clean; the suite teardown reports it again.
    pub fn take_fault(&self) -> Result<()> {
        match self.handle.outcome() {
            Some(Err(e)) if !self.fault_reported.swap(true, Ordering::SeqCst) => Err(e.into()),
            _ => Ok(()),
        }
    }
}
