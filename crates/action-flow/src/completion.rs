//! Completion observers
//!
//! Both observers run on the shared [`Watch`] task and settle exactly once.
//! The connector observer waits for the provider modal to close; the swap
//! observer diffs the result dialog for a success or an error marker.

use std::sync::Arc;
use std::time::Duration;

use action_primitives::{ActionError, Probe, Watch, WatchOutcome, WatchSpec};
use async_trait::async_trait;
use domflow_core_types::{Document, DomError, ElementRef, ObserveOptions, ObserveTarget};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::errors::FlowError;
use crate::profile::SiteProfile;

pub const RESULT_NOT_FOUND: &str = "Transaction result not found";
pub const MODAL_NOT_CLOSED: &str = "Wallet modal did not close";

/// Terminal state of an asynchronous host operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionSignal {
    Success(String),
    Failure(String),
}

/// Holds once the modal lost its open class token or left the document.
pub struct ModalClosed {
    pub modal: ElementRef,
    pub open_class: String,
}

#[async_trait]
impl Probe for ModalClosed {
    type Output = ();

    async fn probe(&self, document: &dyn Document) -> Result<Option<()>, ActionError> {
        match document.has_class(&self.modal, &self.open_class).await {
            Ok(true) => Ok(None),
            Ok(false) | Err(DomError::Detached(_)) => Ok(Some(())),
            Err(err) => Err(err.into()),
        }
    }
}

/// Waits for the provider modal to close, then reports whether the wallet
/// ended up connected.
pub struct ConnectorCompletion {
    document: Arc<dyn Document>,
    connect_button: String,
    open_class: String,
    settle: Duration,
    timeout: Duration,
}

impl ConnectorCompletion {
    pub fn new(
        document: Arc<dyn Document>,
        profile: &SiteProfile,
        settle: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            document,
            connect_button: profile.connect_button.clone(),
            open_class: profile.modal_open_class.clone(),
            settle,
            timeout,
        }
    }

    pub async fn wait(&self, modal: &ElementRef) -> Result<bool, FlowError> {
        // The modal may be unmounted instead of losing its class, which only
        // an ancestor sees.
        let spec = WatchSpec {
            target: ObserveTarget::Body,
            options: ObserveOptions {
                attributes: true,
                ..ObserveOptions::subtree_changes()
            }
            .with_attribute_filter(&["class"]),
            timeout: self.timeout,
        };
        let probe = ModalClosed {
            modal: modal.clone(),
            open_class: self.open_class.clone(),
        };

        match Watch::spawn(self.document.clone(), spec, probe).settled().await? {
            WatchOutcome::Settled(()) => {
                debug!(settle_ms = self.settle.as_millis() as u64, "provider modal closed");
                sleep(self.settle).await;
                let connected = !self.document.exists(&self.connect_button).await?;
                info!(connected, "wallet modal settled");
                Ok(connected)
            }
            WatchOutcome::TimedOut => Err(FlowError::Timeout(MODAL_NOT_CLOSED.into())),
            WatchOutcome::Cancelled => {
                Err(ActionError::Cancelled("wallet modal watch cancelled".into()).into())
            }
        }
    }
}

/// Looks for a success marker (and the link next to it) or an error marker
/// inside the result dialog.
pub struct SwapResultProbe {
    pub dialog: ElementRef,
    pub success_marker: String,
    pub error_marker: String,
    pub result_link: String,
}

#[async_trait]
impl Probe for SwapResultProbe {
    type Output = CompletionSignal;

    async fn probe(
        &self,
        document: &dyn Document,
    ) -> Result<Option<CompletionSignal>, ActionError> {
        if let Some(marker) = document
            .query_within(&self.dialog, &self.success_marker)
            .await?
        {
            let scope = document.parent(&marker).await?.unwrap_or(marker);
            let Some(link) = document.query_within(&scope, &self.result_link).await? else {
                debug!("success marker without link yet");
                return Ok(None);
            };
            return Ok(document
                .attribute(&link, "href")
                .await?
                .map(CompletionSignal::Success));
        }

        if let Some(marker) = document
            .query_within(&self.dialog, &self.error_marker)
            .await?
        {
            let reason = document.text_content(&marker).await?;
            return Ok(Some(CompletionSignal::Failure(reason)));
        }

        Ok(None)
    }
}

/// Watches the swap result dialog until the host reports an outcome.
pub struct SwapCompletion {
    document: Arc<dyn Document>,
    success_marker: String,
    error_marker: String,
    result_link: String,
    timeout: Duration,
}

impl SwapCompletion {
    pub fn new(document: Arc<dyn Document>, profile: &SiteProfile, timeout: Duration) -> Self {
        Self {
            document,
            success_marker: profile.success_marker.clone(),
            error_marker: profile.error_marker.clone(),
            result_link: profile.result_link.clone(),
            timeout,
        }
    }

    /// Start watching `dialog`. The returned handle can be cancelled.
    pub fn watch(&self, dialog: &ElementRef) -> Watch<CompletionSignal> {
        let spec = WatchSpec {
            target: ObserveTarget::Element(dialog.clone()),
            options: ObserveOptions {
                child_list: true,
                subtree: true,
                ..ObserveOptions::default()
            },
            timeout: self.timeout,
        };
        Watch::spawn(
            self.document.clone(),
            spec,
            SwapResultProbe {
                dialog: dialog.clone(),
                success_marker: self.success_marker.clone(),
                error_marker: self.error_marker.clone(),
                result_link: self.result_link.clone(),
            },
        )
    }

    /// Resolve with the transaction URL, or fail with the host's error text.
    pub async fn wait(&self, dialog: &ElementRef) -> Result<String, FlowError> {
        match self.watch(dialog).settled().await? {
            WatchOutcome::Settled(CompletionSignal::Success(url)) => {
                info!(url = %url, "swap confirmed");
                Ok(url)
            }
            WatchOutcome::Settled(CompletionSignal::Failure(reason)) => {
                info!(reason = %reason, "swap rejected by host");
                Err(FlowError::HostValidation(reason))
            }
            WatchOutcome::TimedOut => Err(FlowError::Timeout(RESULT_NOT_FOUND.into())),
            WatchOutcome::Cancelled => {
                Err(ActionError::Cancelled("swap result watch cancelled".into()).into())
            }
        }
    }
}
