use std::time::Duration;

use domflow_core_types::{Document, ElementRef};
use tokio::time::sleep;
use tracing::debug;

use crate::{errors::ActionError, types::DEFAULT_FOCUS_PAUSE_MS};

/// Focus, blur, pause, focus again. When the element supports a selection
/// range the caret ends up after the current value.
pub async fn double_focus(document: &dyn Document, element: &ElementRef) -> Result<(), ActionError> {
    double_focus_with(
        document,
        element,
        Duration::from_millis(DEFAULT_FOCUS_PAUSE_MS),
    )
    .await
}

pub async fn double_focus_with(
    document: &dyn Document,
    element: &ElementRef,
    pause: Duration,
) -> Result<(), ActionError> {
    debug!(element = %element, "double focus");
    document.focus(element).await?;
    document.blur(element).await?;
    sleep(pause).await;
    document.focus(element).await?;

    if document.supports_selection(element).await? {
        let end = document.value(element).await?.chars().count();
        document.set_selection_range(element, end, end).await?;
    }
    Ok(())
}
