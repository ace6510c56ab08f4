//! The shared mutation watch task.
//!
//! Every wait primitive and completion observer runs the same shape: check the
//! condition once, and only when it does not hold yet attach a mutation
//! observer, re-check after every delivered batch, and give up at a deadline.
//! [`Watch`] owns that loop. It settles exactly once, and the observer and
//! timer it created are released on whichever path settles.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domflow_core_types::{Document, DomError, ObserveOptions, ObserveTarget};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::ActionError;

/// Condition evaluated against the document.
///
/// `Ok(Some(value))` settles the watch with `value`, `Ok(None)` keeps it
/// waiting, an error settles it with that error.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn probe(&self, document: &dyn Document) -> Result<Option<Self::Output>, ActionError>;
}

/// What to observe while the probe does not hold, and for how long.
#[derive(Clone, Debug)]
pub struct WatchSpec {
    pub target: ObserveTarget,
    pub options: ObserveOptions,
    pub timeout: Duration,
}

impl WatchSpec {
    /// Child list and text changes anywhere under the body.
    pub fn body(timeout: Duration) -> Self {
        Self {
            target: ObserveTarget::Body,
            options: ObserveOptions::subtree_changes(),
            timeout,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchOutcome<T> {
    Settled(T),
    TimedOut,
    Cancelled,
}

impl<T> WatchOutcome<T> {
    pub fn settled(self) -> Option<T> {
        match self {
            WatchOutcome::Settled(value) => Some(value),
            WatchOutcome::TimedOut | WatchOutcome::Cancelled => None,
        }
    }
}

/// Handle to a running watch.
///
/// Dropping the handle, or the future returned by [`Watch::settled`], cancels
/// the watch.
pub struct Watch<T> {
    cancel: CancellationToken,
    handle: Option<JoinHandle<Result<WatchOutcome<T>, ActionError>>>,
}

impl<T: Send + 'static> Watch<T> {
    pub fn spawn<P>(document: Arc<dyn Document>, spec: WatchSpec, probe: P) -> Self
    where
        P: Probe<Output = T>,
    {
        let cancel = CancellationToken::new();
        let deadline = Instant::now() + spec.timeout;
        let handle = tokio::spawn(run(document, spec, probe, deadline, cancel.clone()));
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop waiting. The watch settles as [`WatchOutcome::Cancelled`] unless it
    /// already settled some other way.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn settled(mut self) -> Result<WatchOutcome<T>, ActionError> {
        let Some(handle) = self.handle.take() else {
            return Err(ActionError::Internal("watch already awaited".into()));
        };
        handle
            .await
            .map_err(|err| ActionError::Internal(format!("watch task failed: {err}")))?
    }
}

impl<T> Drop for Watch<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<P: Probe>(
    document: Arc<dyn Document>,
    spec: WatchSpec,
    probe: P,
    deadline: Instant,
    cancel: CancellationToken,
) -> Result<WatchOutcome<P::Output>, ActionError> {
    if let Some(value) = probe.probe(document.as_ref()).await? {
        debug!("watch settled without observing");
        return Ok(WatchOutcome::Settled(value));
    }

    let mut subscription = document.observe(&spec.target, spec.options).await?;

    // The condition may have flipped between the first probe and attaching.
    if let Some(value) = probe.probe(document.as_ref()).await? {
        debug!("watch settled while attaching observer");
        return Ok(WatchOutcome::Settled(value));
    }

    let timer = sleep_until(deadline);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("watch cancelled");
                return Ok(WatchOutcome::Cancelled);
            }
            _ = &mut timer => {
                debug!(timeout_ms = spec.timeout.as_millis() as u64, "watch timed out");
                return Ok(WatchOutcome::TimedOut);
            }
            batch = subscription.next_batch() => {
                let Some(batch) = batch else {
                    return Err(DomError::Protocol("mutation observer closed".into()).into());
                };
                debug!(records = batch.len(), "mutation batch");
                if let Some(value) = probe.probe(document.as_ref()).await? {
                    return Ok(WatchOutcome::Settled(value));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_memory::{ElementSpec, MemoryDocument};

    struct Present(&'static str);

    #[async_trait]
    impl Probe for Present {
        type Output = ();

        async fn probe(&self, document: &dyn Document) -> Result<Option<()>, ActionError> {
            Ok(document.exists(self.0).await?.then_some(()))
        }
    }

    fn document() -> (MemoryDocument, Arc<dyn Document>) {
        let memory = MemoryDocument::new();
        let port: Arc<dyn Document> = Arc::new(memory.clone());
        (memory, port)
    }

    #[tokio::test(start_paused = true)]
    async fn fast_path_never_observes() {
        let (memory, port) = document();
        memory.append_to_body(ElementSpec::new("p"));
        let watch = Watch::spawn(port, WatchSpec::body(Duration::from_secs(1)), Present("p"));
        assert_eq!(watch.settled().await.unwrap(), WatchOutcome::Settled(()));
        assert_eq!(memory.observers_created(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn settles_on_mutation() {
        let (memory, port) = document();
        let watch = Watch::spawn(port, WatchSpec::body(Duration::from_secs(5)), Present("p"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        memory.append_to_body(ElementSpec::new("p"));
        assert_eq!(watch.settled().await.unwrap(), WatchOutcome::Settled(()));
        assert_eq!(memory.active_observers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_releases_observer() {
        let (memory, port) = document();
        let watch = Watch::spawn(port, WatchSpec::body(Duration::from_secs(5)), Present("p"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(memory.active_observers(), 1);
        watch.cancel();
        assert_eq!(watch.settled().await.unwrap(), WatchOutcome::Cancelled);
        assert_eq!(memory.active_observers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let (memory, port) = document();
        let watch = Watch::spawn(port, WatchSpec::body(Duration::from_secs(5)), Present("p"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(watch);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(memory.active_observers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_errors_settle_the_watch() {
        let (_memory, port) = document();
        let watch = Watch::spawn(port, WatchSpec::body(Duration::from_secs(5)), Present("p:hover"));
        assert!(matches!(
            watch.settled().await,
            Err(ActionError::Dom(DomError::InvalidSelector(_)))
        ));
    }
}
