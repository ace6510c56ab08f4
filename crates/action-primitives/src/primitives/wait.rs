//! Wait primitives: resolve once a DOM condition holds or a timeout elapses.
//!
//! Absence is never an error here. A selector that does not show up in time
//! yields `None` (or `false`); only backend failures surface as `Err`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domflow_core_types::{Document, ElementRef};
use tracing::debug;

use crate::{
    errors::ActionError,
    types::ElementQuery,
    waiting::{Probe, Watch, WatchOutcome, WatchSpec},
};

/// First element matching a selector.
pub struct ElementPresent {
    pub selector: String,
}

#[async_trait]
impl Probe for ElementPresent {
    type Output = ElementRef;

    async fn probe(&self, document: &dyn Document) -> Result<Option<ElementRef>, ActionError> {
        Ok(document.query(&self.selector).await?)
    }
}

/// First selector, in list order, that matches anything.
pub struct AnyElementPresent {
    pub selectors: Vec<String>,
}

#[async_trait]
impl Probe for AnyElementPresent {
    type Output = (usize, ElementRef);

    async fn probe(
        &self,
        document: &dyn Document,
    ) -> Result<Option<(usize, ElementRef)>, ActionError> {
        for (index, selector) in self.selectors.iter().enumerate() {
            if let Some(element) = document.query(selector).await? {
                return Ok(Some((index, element)));
            }
        }
        Ok(None)
    }
}

/// Holds once nothing matches the selector.
pub struct ElementAbsent {
    pub selector: String,
}

#[async_trait]
impl Probe for ElementAbsent {
    type Output = ();

    async fn probe(&self, document: &dyn Document) -> Result<Option<()>, ActionError> {
        Ok((!document.exists(&self.selector).await?).then_some(()))
    }
}

fn unwrap_outcome<T>(outcome: WatchOutcome<T>) -> Result<Option<T>, ActionError> {
    match outcome {
        WatchOutcome::Settled(value) => Ok(Some(value)),
        WatchOutcome::TimedOut => Ok(None),
        WatchOutcome::Cancelled => Err(ActionError::Cancelled("wait cancelled".into())),
    }
}

/// Wait until `selector` matches, returning the first match or `None` after
/// `timeout`.
pub async fn wait_for_element(
    document: &Arc<dyn Document>,
    selector: &str,
    timeout: Duration,
) -> Result<Option<ElementRef>, ActionError> {
    debug!(selector, timeout_ms = timeout.as_millis() as u64, "waiting for element");
    let watch = Watch::spawn(
        document.clone(),
        WatchSpec::body(timeout),
        ElementPresent {
            selector: selector.to_string(),
        },
    );
    unwrap_outcome(watch.settled().await?)
}

/// Wait until any of `selectors` matches. Returns the index of the selector
/// that matched along with the element; earlier selectors win when several
/// match at once.
pub async fn wait_for_any_element(
    document: &Arc<dyn Document>,
    selectors: &[&str],
    timeout: Duration,
) -> Result<Option<(usize, ElementRef)>, ActionError> {
    debug!(?selectors, timeout_ms = timeout.as_millis() as u64, "waiting for any element");
    let watch = Watch::spawn(
        document.clone(),
        WatchSpec::body(timeout),
        AnyElementPresent {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
        },
    );
    unwrap_outcome(watch.settled().await?)
}

/// Wait until nothing matches `selector`. `false` on timeout.
pub async fn wait_for_element_removed(
    document: &Arc<dyn Document>,
    selector: &str,
    timeout: Duration,
) -> Result<bool, ActionError> {
    debug!(selector, timeout_ms = timeout.as_millis() as u64, "waiting for element removal");
    let watch = Watch::spawn(
        document.clone(),
        WatchSpec::body(timeout),
        ElementAbsent {
            selector: selector.to_string(),
        },
    );
    Ok(unwrap_outcome(watch.settled().await?)?.is_some())
}

impl ElementQuery {
    /// Wait for the query, returning the element matched by the earliest
    /// selector.
    pub async fn wait(
        &self,
        document: &Arc<dyn Document>,
    ) -> Result<Option<ElementRef>, ActionError> {
        match self.selectors.as_slice() {
            [] => Err(ActionError::Internal("element query has no selectors".into())),
            [selector] => wait_for_element(document, selector, self.timeout()).await,
            selectors => {
                let selectors: Vec<&str> = selectors.iter().map(String::as_str).collect();
                Ok(wait_for_any_element(document, &selectors, self.timeout())
                    .await?
                    .map(|(_, element)| element))
            }
        }
    }
}
