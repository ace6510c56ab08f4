//! Step tracing for workflows

use std::future::Future;

use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::errors::FlowError;

/// Run one workflow step inside its own span, logging how it ended.
pub(crate) async fn step<T, F>(name: &'static str, fut: F) -> Result<T, FlowError>
where
    F: Future<Output = Result<T, FlowError>>,
{
    let started = Instant::now();
    let span = info_span!("step", step = name);
    async move {
        let result = fut.await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(elapsed_ms, "step completed"),
            Err(err) => warn!(elapsed_ms, kind = err.kind(), error = %err, "step failed"),
        }
        result
    }
    .instrument(span)
    .await
}
