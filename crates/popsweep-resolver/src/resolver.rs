use crate::handle::Settlement;
use crate::{ActionOutcome, Driver, DriverError, Error, Locator, PollHandle, PollOptions, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Polls a driver for transient elements, one poll at a time.
///
/// Must be used from inside a tokio runtime: every poll runs as a spawned
/// task so the caller is never blocked. Dropping the resolver cancels any
/// poll still running.
pub struct Resolver<D: Driver + 'static> {
    driver: Arc<D>,
    shutdown: CancellationToken,
    active: Mutex<Option<PollHandle>>,
}

impl<D: Driver + 'static> Resolver<D> {
    pub fn new(driver: Arc<D>) -> Self {
        Self {
            driver,
            shutdown: CancellationToken::new(),
            active: Mutex::new(None),
        }
    }

    pub fn driver(&self) -> &Arc<D> {
        &self.driver
    }

    /// Start polling for `locator` in the background.
    ///
    /// While a poll is in flight, resolving the same locator with the same
    /// options returns a handle to that poll, so the action still fires
    /// once. Anything else (another locator, or the same locator with a
    /// different interval, timeout or action) is refused with
    /// [`Error::Busy`].
    pub fn resolve(&self, locator: Locator, options: PollOptions) -> Result<PollHandle> {
        options.validate()?;

        let mut active = self.active.lock();
        if let Some(current) = active.as_ref().filter(|h| !h.is_settled()) {
            if current.locator() == &locator && current.options() == &options {
                debug!("Joining in-flight poll for '{}'", locator);
                return Ok(current.clone());
            }
            return Err(Error::Busy {
                active: current.locator().to_string(),
            });
        }

        let cancel = self.shutdown.child_token();
        let started = Instant::now();
        let deadline = options.timeout.map(|t| started + t);
        let (tx, rx) = watch::channel::<Settlement>(None);
        let handle = PollHandle::new(
            locator.clone(),
            options.clone(),
            deadline,
            cancel.clone(),
            rx,
        );

        debug!(
            "Polling for '{}' every {}ms (timeout: {:?})",
            locator,
            options.interval.as_millis(),
            options.timeout
        );

        let driver = Arc::clone(&self.driver);
        tokio::spawn(async move {
            let poll = Poll {
                locator: &locator,
                options: &options,
                cancel: &cancel,
                deadline,
                started,
                probes: 0,
            };
            let settlement = poll.run(driver.as_ref()).await;
            match &settlement {
                Ok(outcome) => info!("Poll for '{}' settled: {}", locator, outcome),
                Err(e) => warn!("Poll for '{}' failed: {}", locator, e),
            }
            // Receivers may all be gone for fire-and-forget polls.
            let _ = tx.send(Some(settlement));
        });

        *active = Some(handle.clone());
        Ok(handle)
    }

    /// The poll currently in flight, if any.
    pub fn active(&self) -> Option<PollHandle> {
        self.active
            .lock()
            .as_ref()
            .filter(|h| !h.is_settled())
            .cloned()
    }

    /// Cancel every poll started by this resolver, including future ones.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl<D: Driver + 'static> Drop for Resolver<D> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct Poll<'a> {
    locator: &'a Locator,
    options: &'a PollOptions,
    cancel: &'a CancellationToken,
    deadline: Option<Instant>,
    started: Instant,
    probes: u32,
}

impl Poll<'_> {
    async fn run<D: Driver>(mut self, driver: &D) -> Result<ActionOutcome> {
        if !self.options.probe_immediately {
            if let Some(outcome) = self.pause().await {
                return Ok(outcome);
            }
        }

        loop {
            let found = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(self.cancelled()),
                _ = until(self.deadline) => return Ok(self.timed_out()),
                found = driver.query(self.locator) => found,
            };
            self.probes += 1;

            let elements = found.map_err(|e| self.fault(e))?;
            debug!(
                "Probe {} for '{}': {} match(es)",
                self.probes,
                self.locator,
                elements.len()
            );

            // The action is never raced: once started it completes.
            if let Some(first) = elements.first() {
                driver
                    .apply_action(first, &self.options.action)
                    .await
                    .map_err(|e| self.fault(e))?;
                return Ok(ActionOutcome::FoundAndActed {
                    probes: self.probes,
                    elapsed: self.started.elapsed(),
                });
            }

            if let Some(outcome) = self.pause().await {
                return Ok(outcome);
            }
        }
    }

    /// Sleep one interval. Returns a terminal outcome if cancelled or past the deadline.
    async fn pause(&self) -> Option<ActionOutcome> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Some(self.cancelled()),
            _ = until(self.deadline) => Some(self.timed_out()),
            _ = tokio::time::sleep(self.options.interval) => None,
        }
    }

    fn cancelled(&self) -> ActionOutcome {
        ActionOutcome::Cancelled {
            probes: self.probes,
            elapsed: self.started.elapsed(),
        }
    }

    fn timed_out(&self) -> ActionOutcome {
        ActionOutcome::TimedOut {
            probes: self.probes,
            elapsed: self.started.elapsed(),
        }
    }

    fn fault(&self, source: DriverError) -> Error {
        Error::DriverFault {
            locator: self.locator.to_string(),
            elapsed_ms: elapsed_ms(self.started.elapsed()),
            source,
        }
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn elapsed_ms(elapsed: Duration) -> u64 {
    elapsed.as_millis() as u64
}
