use crate::{ActionOutcome, Error, Locator, PollOptions, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// `None` while polling, then the single terminal result.
pub(crate) type Settlement = Option<Result<ActionOutcome>>;

/// Live state of one in-flight poll.
///
/// Clones refer to the same poll. Dropping every clone does not stop the
/// poll; call [`cancel`](Self::cancel) or shut the resolver down for that.
#[derive(Debug, Clone)]
pub struct PollHandle {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    locator: Locator,
    options: PollOptions,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    settled: watch::Receiver<Settlement>,
}

impl PollHandle {
    pub(crate) fn new(
        locator: Locator,
        options: PollOptions,
        deadline: Option<Instant>,
        cancel: CancellationToken,
        settled: watch::Receiver<Settlement>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                locator,
                options,
                deadline,
                cancel,
                settled,
            }),
        }
    }

    pub fn locator(&self) -> &Locator {
        &self.inner.locator
    }

    pub fn interval(&self) -> Duration {
        self.inner.options.interval
    }

    /// Options the poll was armed with.
    pub fn options(&self) -> &PollOptions {
        &self.inner.options
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Stop polling. No-op once settled.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_settled(&self) -> bool {
        self.inner.settled.borrow().is_some()
    }

    /// Terminal result if the poll has settled, without waiting.
    pub fn outcome(&self) -> Option<Result<ActionOutcome>> {
        self.inner.settled.borrow().clone()
    }

    /// Wait for the poll to settle.
    pub async fn settled(&self) -> Result<ActionOutcome> {
        let mut rx = self.inner.settled.clone();
        let settlement = match rx.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };
        settlement.unwrap_or_else(|| {
            Err(Error::Abandoned {
                locator: self.inner.locator.to_string(),
            })
        })
    }

    /// Cancel, then wait for the terminal result. An action already being
    /// applied still completes and wins.
    pub async fn cancel_and_settle(&self) -> Result<ActionOutcome> {
        self.cancel();
        self.settled().await
    }

    /// Whether both handles track the same poll.
    pub fn same_poll(&self, other: &PollHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
