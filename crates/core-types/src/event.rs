use serde::{Deserialize, Serialize};

/// Closed set of element capabilities that drive text insertion.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ElementCapability {
    /// `contenteditable` host, edited through editing commands
    ContentEditable,
    /// `<input>` / `<textarea>` with a native `value` property
    NativeValue,
    /// Anything else; only text content can be replaced
    Generic,
}

/// Which `value` setter a backend should go through.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ValueSetter {
    /// Plain assignment on the instance. Frameworks that instrument the
    /// instance property observe this write.
    Instance,
    /// The setter taken from the element prototype's property descriptor,
    /// bypassing any instance-level instrumentation.
    Prototype,
}

/// Editing commands applied to the focused editing host.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum EditCommand {
    SelectAll,
    Delete,
    InsertText(String),
}

impl EditCommand {
    pub fn name(&self) -> &'static str {
        match self {
            EditCommand::SelectAll => "selectAll",
            EditCommand::Delete => "delete",
            EditCommand::InsertText(_) => "insertText",
        }
    }

    pub fn argument(&self) -> Option<&str> {
        match self {
            EditCommand::InsertText(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum DomEventKind {
    Click,
    Focus,
    Blur,
    Input,
    Change,
    KeyDown,
    KeyPress,
    KeyUp,
    Paste,
}

impl DomEventKind {
    /// DOM event type string.
    pub fn type_name(&self) -> &'static str {
        match self {
            DomEventKind::Click => "click",
            DomEventKind::Focus => "focus",
            DomEventKind::Blur => "blur",
            DomEventKind::Input => "input",
            DomEventKind::Change => "change",
            DomEventKind::KeyDown => "keydown",
            DomEventKind::KeyPress => "keypress",
            DomEventKind::KeyUp => "keyup",
            DomEventKind::Paste => "paste",
        }
    }
}

/// A synthetic event to dispatch at an element.
///
/// `data` carries the key for keyboard events and the clipboard text for
/// paste events.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DomEvent {
    pub kind: DomEventKind,
    pub bubbles: bool,
    pub cancelable: bool,
    pub data: Option<String>,
}

impl DomEvent {
    pub fn new(kind: DomEventKind) -> Self {
        Self {
            kind,
            bubbles: true,
            cancelable: false,
            data: None,
        }
    }

    /// Bubbling, cancelable mouse click.
    pub fn click() -> Self {
        Self {
            cancelable: true,
            ..Self::new(DomEventKind::Click)
        }
    }

    pub fn input() -> Self {
        Self::new(DomEventKind::Input)
    }

    pub fn change() -> Self {
        Self::new(DomEventKind::Change)
    }

    pub fn key(kind: DomEventKind, key: char) -> Self {
        Self {
            cancelable: true,
            data: Some(key.to_string()),
            ..Self::new(kind)
        }
    }

    pub fn paste(text: impl Into<String>) -> Self {
        Self {
            cancelable: true,
            data: Some(text.into()),
            ..Self::new(DomEventKind::Paste)
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}
