//! Text entry primitives

use std::time::Duration;

use domflow_core_types::{
    Document, DomEvent, DomEventKind, EditCommand, ElementCapability, ElementRef, ValueSetter,
};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{errors::ActionError, primitives::focus::double_focus};

/// Replace the content of `element` with `text` in a way input listeners of
/// the host page observe.
///
/// Never fails: any error is logged and reported as `false`.
pub async fn insert_text_into_element(
    document: &dyn Document,
    element: &ElementRef,
    text: &str,
) -> bool {
    match insert_text(document, element, text).await {
        Ok(()) => true,
        Err(err) => {
            warn!(element = %element, error = %err, "text insertion failed");
            false
        }
    }
}

async fn insert_text(
    document: &dyn Document,
    element: &ElementRef,
    text: &str,
) -> Result<(), ActionError> {
    let capability = document.capability(element).await?;
    info!(element = %element, ?capability, chars = text.chars().count(), "Executing type_text primitive");
    match capability {
        ElementCapability::ContentEditable => insert_into_editable(document, element, text).await,
        ElementCapability::NativeValue => insert_into_native(document, element, text).await,
        ElementCapability::Generic => insert_into_generic(document, element, text).await,
    }
}

async fn insert_into_editable(
    document: &dyn Document,
    element: &ElementRef,
    text: &str,
) -> Result<(), ActionError> {
    document.focus(element).await?;
    for command in [
        EditCommand::SelectAll,
        EditCommand::Delete,
        EditCommand::InsertText(text.to_string()),
    ] {
        let name = command.name();
        if !document.exec_command(command).await? {
            return Err(ActionError::Internal(format!(
                "editing command {name} was rejected"
            )));
        }
    }
    document.dispatch(element, DomEvent::paste(text)).await?;
    document.dispatch(element, DomEvent::input()).await?;
    Ok(())
}

async fn insert_into_native(
    document: &dyn Document,
    element: &ElementRef,
    text: &str,
) -> Result<(), ActionError> {
    double_focus(document, element).await?;
    document
        .set_value(element, text, ValueSetter::Prototype)
        .await?;
    document.dispatch(element, DomEvent::input()).await?;
    document.dispatch(element, DomEvent::change()).await?;
    Ok(())
}

async fn insert_into_generic(
    document: &dyn Document,
    element: &ElementRef,
    text: &str,
) -> Result<(), ActionError> {
    document.focus(element).await?;
    document.set_text_content(element, text).await?;
    document.dispatch(element, DomEvent::input()).await?;
    Ok(())
}

/// Set the value of a framework-controlled input so the framework registers
/// the change: assign the value, rewind the value tracker to the old value,
/// then dispatch one `input` event.
pub async fn set_react_input_value(
    document: &dyn Document,
    input: &ElementRef,
    value: &str,
) -> Result<(), ActionError> {
    let previous = document.value(input).await?;
    document.set_value(input, value, ValueSetter::Instance).await?;
    if !document.reset_value_tracker(input, &previous).await? {
        debug!(element = %input, "no value tracker on input");
    }
    document.dispatch(input, DomEvent::input()).await?;
    Ok(())
}

/// Clear `input`, then type `text` one character at a time with `delay`
/// between characters, finishing with a `change` event.
pub async fn simulate_typing(
    document: &dyn Document,
    input: &ElementRef,
    text: &str,
    delay: Duration,
) -> Result<(), ActionError> {
    info!(element = %input, chars = text.chars().count(), "Simulating typing");
    document.set_value(input, "", ValueSetter::Prototype).await?;

    let mut typed = String::with_capacity(text.len());
    for (index, ch) in text.chars().enumerate() {
        if index > 0 {
            sleep(delay).await;
        }
        typed.push(ch);
        document
            .set_value(input, &typed, ValueSetter::Prototype)
            .await?;
        for kind in [
            DomEventKind::KeyDown,
            DomEventKind::KeyPress,
            DomEventKind::KeyUp,
        ] {
            document.dispatch(input, DomEvent::key(kind, ch)).await?;
        }
        document.dispatch(input, DomEvent::input()).await?;
    }

    document.dispatch(input, DomEvent::change()).await?;
    Ok(())
}
