use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::ElementRef;

/// Root of an observation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ObserveTarget {
    Body,
    Element(ElementRef),
}

/// Mirrors `MutationObserverInit`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute_filter: Option<Vec<String>>,
    pub character_data: bool,
}

impl ObserveOptions {
    /// `childList` + `subtree`: structural changes anywhere below the target.
    pub fn subtree_changes() -> Self {
        Self {
            child_list: true,
            subtree: true,
            character_data: true,
            ..Self::default()
        }
    }

    /// Attribute changes on the target itself.
    pub fn attributes() -> Self {
        Self {
            attributes: true,
            ..Self::default()
        }
    }

    pub fn with_attribute_filter(mut self, names: &[&str]) -> Self {
        self.attribute_filter = Some(names.iter().map(|name| name.to_string()).collect());
        self
    }

    /// Whether an attribute record with this name is delivered.
    pub fn wants_attribute(&self, name: &str) -> bool {
        self.attributes
            && self
                .attribute_filter
                .as_ref()
                .map_or(true, |filter| filter.iter().any(|f| f == name))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MutationKind {
    ChildList,
    Attributes { name: String },
    CharacterData,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// Node the record was queued for, when the backend can name it.
    pub target: Option<ElementRef>,
}

/// One observer callback's worth of records.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MutationBatch {
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    pub fn new(records: Vec<MutationRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

type DisconnectHook = Box<dyn FnOnce() + Send>;

/// Live mutation observer registration.
///
/// Batches arrive in the order the backend delivered them. The observer is
/// disconnected exactly once: either through [`MutationSubscription::disconnect`]
/// or when the subscription is dropped.
pub struct MutationSubscription {
    receiver: mpsc::UnboundedReceiver<MutationBatch>,
    disconnect: Option<DisconnectHook>,
}

impl MutationSubscription {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<MutationBatch>,
        disconnect: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            disconnect: Some(Box::new(disconnect)),
        }
    }

    /// Next batch, or `None` once the backend closed the channel.
    pub async fn next_batch(&mut self) -> Option<MutationBatch> {
        self.receiver.recv().await
    }

    pub fn disconnect(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.receiver.close();
        if let Some(hook) = self.disconnect.take() {
            hook();
        }
    }
}

impl Drop for MutationSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for MutationSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationSubscription")
            .field("connected", &self.disconnect.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn attribute_filter_limits_delivery() {
        let options = ObserveOptions::attributes().with_attribute_filter(&["class"]);
        assert!(options.wants_attribute("class"));
        assert!(!options.wants_attribute("style"));
        assert!(!ObserveOptions::subtree_changes().wants_attribute("class"));
    }

    #[test]
    fn disconnect_hook_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = mpsc::unbounded_channel();
        let counter = calls.clone();
        let subscription = MutationSubscription::new(rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        subscription.disconnect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_subscription_disconnects() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        let counter = calls.clone();
        {
            let mut subscription = MutationSubscription::new(rx, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            tx.send(MutationBatch::default()).unwrap();
            assert!(subscription.next_batch().await.is_some());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(tx.send(MutationBatch::default()).is_err());
    }
}
