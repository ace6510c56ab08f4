use async_trait::async_trait;

use crate::{
    DomError, DomEvent, EditCommand, ElementCapability, ElementRef, MutationSubscription,
    ObserveOptions, ObserveTarget, ValueSetter,
};

/// Port onto a host page's DOM.
///
/// Implementations translate each call into whatever the backend needs
/// (direct tree manipulation, DevTools protocol calls). None of the methods
/// create elements: effects only ever act on handles a query already returned.
#[async_trait]
pub trait Document: Send + Sync {
    /// `document.querySelector`
    async fn query(&self, selector: &str) -> Result<Option<ElementRef>, DomError>;

    /// `document.querySelectorAll`, in document order
    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>, DomError>;

    async fn query_within(
        &self,
        root: &ElementRef,
        selector: &str,
    ) -> Result<Option<ElementRef>, DomError>;

    async fn query_all_within(
        &self,
        root: &ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, DomError>;

    async fn parent(&self, element: &ElementRef) -> Result<Option<ElementRef>, DomError>;

    async fn text_content(&self, element: &ElementRef) -> Result<String, DomError>;

    async fn attribute(&self, element: &ElementRef, name: &str)
        -> Result<Option<String>, DomError>;

    async fn has_class(&self, element: &ElementRef, class: &str) -> Result<bool, DomError>;

    async fn is_disabled(&self, element: &ElementRef) -> Result<bool, DomError>;

    /// Current `value` property of a form control
    async fn value(&self, element: &ElementRef) -> Result<String, DomError>;

    async fn capability(&self, element: &ElementRef) -> Result<ElementCapability, DomError>;

    /// Whether `setSelectionRange` is available on the element
    async fn supports_selection(&self, element: &ElementRef) -> Result<bool, DomError>;

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<(), DomError>;

    async fn focus(&self, element: &ElementRef) -> Result<(), DomError>;

    async fn blur(&self, element: &ElementRef) -> Result<(), DomError>;

    async fn dispatch(&self, element: &ElementRef, event: DomEvent) -> Result<(), DomError>;

    async fn set_selection_range(
        &self,
        element: &ElementRef,
        start: usize,
        end: usize,
    ) -> Result<(), DomError>;

    /// `document.execCommand` against the focused editing host. Returns the
    /// command's own success flag.
    async fn exec_command(&self, command: EditCommand) -> Result<bool, DomError>;

    async fn set_value(
        &self,
        element: &ElementRef,
        value: &str,
        setter: ValueSetter,
    ) -> Result<(), DomError>;

    async fn set_text_content(&self, element: &ElementRef, text: &str) -> Result<(), DomError>;

    /// Calls `setValue(previous)` on the framework value tracker attached to
    /// the element. Returns `false` when the element carries no tracker.
    async fn reset_value_tracker(
        &self,
        element: &ElementRef,
        previous: &str,
    ) -> Result<bool, DomError>;

    /// Attach a mutation observer. The returned subscription owns the
    /// observer; dropping it disconnects.
    async fn observe(
        &self,
        target: &ObserveTarget,
        options: ObserveOptions,
    ) -> Result<MutationSubscription, DomError>;

    async fn exists(&self, selector: &str) -> Result<bool, DomError> {
        Ok(self.query(selector).await?.is_some())
    }
}
