//! Click primitive

use std::time::Duration;

use domflow_core_types::{Document, DomEvent, ElementRef};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::errors::ActionError;

/// Scroll `element` into view, wait `delay`, then dispatch a bubbling,
/// cancelable `click`.
///
/// Returns `false` without touching the page when there is no element.
pub async fn click_element(
    document: &dyn Document,
    element: Option<&ElementRef>,
    delay: Duration,
) -> Result<bool, ActionError> {
    let Some(element) = element else {
        debug!("click skipped: no element");
        return Ok(false);
    };

    info!(element = %element, delay_ms = delay.as_millis() as u64, "Executing click primitive");
    document.scroll_into_view(element).await?;
    sleep(delay).await;
    document.dispatch(element, DomEvent::click()).await?;
    Ok(true)
}
