//! Routes `Runtime.bindingCalled` payloads to live mutation subscriptions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chromiumoxide::cdp::js_protocol::runtime::EventBindingCalled;
use dashmap::DashMap;
use domflow_core_types::MutationBatch;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::scripts::{parse_batch, BINDING_NAME};

/// Observer id → subscription channel.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    routes: DashMap<u64, mpsc::UnboundedSender<MutationBatch>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> (u64, mpsc::UnboundedReceiver<MutationBatch>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.insert(id, tx);
        (id, rx)
    }

    pub fn remove(&self, id: u64) -> bool {
        self.routes.remove(&id).is_some()
    }

    pub fn active(&self) -> usize {
        self.routes.len()
    }

    /// Delivers one binding payload. Payloads for observers that were
    /// already released are dropped.
    pub fn route(&self, payload: &str) {
        let (id, batch) = match parse_batch(payload) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(target: "cdp-adapter", %err, "dropping mutation payload");
                return;
            }
        };
        if batch.is_empty() {
            return;
        }
        let delivered = self
            .routes
            .get(&id)
            .map(|route| route.send(batch).is_ok())
            .unwrap_or(false);
        if !delivered {
            debug!(target: "cdp-adapter", observer = id, "batch for released observer");
            self.routes.remove(&id);
        }
    }

    /// Pumps binding events into the registry until the stream ends.
    pub fn spawn_pump<S>(self: &Arc<Self>, mut events: S) -> JoinHandle<()>
    where
        S: Stream<Item = Arc<EventBindingCalled>> + Send + Unpin + 'static,
    {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.name == BINDING_NAME {
                    registry.route(&event.payload);
                }
            }
            debug!(target: "cdp-adapter", "binding event stream closed");
        })
    }
}
