use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::{
    AddBindingParams, EvaluateParams, EventBindingCalled,
};
use chromiumoxide::Page;
use domflow_core_types::{
    Document, DomError, DomEvent, EditCommand, ElementCapability, ElementRef,
    MutationSubscription, ObserveOptions, ObserveTarget, ValueSetter,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::observer::ObserverRegistry;
use crate::scripts::{self, BINDING_NAME};

struct Attachment {
    page: Page,
    command_timeout: Duration,
    observers: Arc<ObserverRegistry>,
    pump: JoinHandle<()>,
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// [`Document`] over a live Chromium page.
///
/// Every port call is one `Runtime.evaluate` round trip. Mutation observers
/// run inside the page and report through a `Runtime.addBinding` channel.
#[derive(Clone)]
pub struct CdpDocument {
    inner: Arc<Attachment>,
}

impl CdpDocument {
    /// Installs the mutation binding on `page` and starts routing its calls.
    #[instrument(skip_all, fields(timeout_ms = command_timeout.as_millis() as u64))]
    pub async fn attach(page: Page, command_timeout: Duration) -> Result<Self, DomError> {
        let events = page
            .event_listener::<EventBindingCalled>()
            .await
            .map_err(protocol)?;
        let observers = Arc::new(ObserverRegistry::new());
        let pump = observers.spawn_pump(events);

        let attachment = Attachment {
            page,
            command_timeout,
            observers,
            pump,
        };
        within(
            command_timeout,
            attachment.page.execute(AddBindingParams::new(BINDING_NAME)),
        )
        .await?;
        debug!(target: "cdp-adapter", binding = BINDING_NAME, "mutation binding installed");

        Ok(Self {
            inner: Arc::new(attachment),
        })
    }

    pub fn page(&self) -> &Page {
        &self.inner.page
    }

    /// Observers currently registered with the page.
    pub fn active_observers(&self) -> usize {
        self.inner.observers.active()
    }

    async fn run(&self, script: String) -> Result<Value, DomError> {
        evaluate(&self.inner.page, self.inner.command_timeout, script).await
    }

    async fn run_as<T: DeserializeOwned>(&self, script: String) -> Result<T, DomError> {
        let value = self.run(script).await?;
        serde_json::from_value(value)
            .map_err(|err| DomError::Protocol(format!("unexpected script result: {err}")))
    }

    async fn run_unit(&self, script: String) -> Result<(), DomError> {
        self.run(script).await.map(|_| ())
    }
}

async fn within<F, T>(timeout: Duration, fut: F) -> Result<T, DomError>
where
    F: std::future::Future<Output = Result<T, chromiumoxide::error::CdpError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| DomError::Protocol(format!("cdp command timed out after {timeout:?}")))?
        .map_err(protocol)
}

async fn evaluate(page: &Page, timeout: Duration, script: String) -> Result<Value, DomError> {
    let params = EvaluateParams::builder()
        .expression(script)
        .return_by_value(true)
        .build()
        .map_err(DomError::Internal)?;
    let response = within(timeout, page.execute(params)).await?;
    if let Some(details) = &response.result.exception_details {
        return Err(DomError::Protocol(details.text.clone()));
    }
    let raw = response.result.result.value.clone().unwrap_or(Value::Null);
    scripts::parse_reply(raw)
}

fn protocol(err: chromiumoxide::error::CdpError) -> DomError {
    DomError::Protocol(err.to_string())
}

#[async_trait]
impl Document for CdpDocument {
    async fn query(&self, selector: &str) -> Result<Option<ElementRef>, DomError> {
        let id: Option<String> = self.run_as(scripts::query(selector)).await?;
        Ok(id.map(ElementRef::new))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ElementRef>, DomError> {
        let ids: Vec<String> = self.run_as(scripts::query_all(selector)).await?;
        Ok(ids.into_iter().map(ElementRef::new).collect())
    }

    async fn query_within(
        &self,
        root: &ElementRef,
        selector: &str,
    ) -> Result<Option<ElementRef>, DomError> {
        let id: Option<String> = self.run_as(scripts::query_within(root, selector)).await?;
        Ok(id.map(ElementRef::new))
    }

    async fn query_all_within(
        &self,
        root: &ElementRef,
        selector: &str,
    ) -> Result<Vec<ElementRef>, DomError> {
        let ids: Vec<String> = self
            .run_as(scripts::query_all_within(root, selector))
            .await?;
        Ok(ids.into_iter().map(ElementRef::new).collect())
    }

    async fn parent(&self, element: &ElementRef) -> Result<Option<ElementRef>, DomError> {
        let id: Option<String> = self.run_as(scripts::parent(element)).await?;
        Ok(id.map(ElementRef::new))
    }

    async fn text_content(&self, element: &ElementRef) -> Result<String, DomError> {
        self.run_as(scripts::text_content(element)).await
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DomError> {
        self.run_as(scripts::attribute(element, name)).await
    }

    async fn has_class(&self, element: &ElementRef, class: &str) -> Result<bool, DomError> {
        self.run_as(scripts::has_class(element, class)).await
    }

    async fn is_disabled(&self, element: &ElementRef) -> Result<bool, DomError> {
        self.run_as(scripts::is_disabled(element)).await
    }

    async fn value(&self, element: &ElementRef) -> Result<String, DomError> {
        self.run_as(scripts::value(element)).await
    }

    async fn capability(&self, element: &ElementRef) -> Result<ElementCapability, DomError> {
        self.run_as(scripts::capability(element)).await
    }

    async fn supports_selection(&self, element: &ElementRef) -> Result<bool, DomError> {
        self.run_as(scripts::supports_selection(element)).await
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<(), DomError> {
        self.run_unit(scripts::scroll_into_view(element)).await
    }

    async fn focus(&self, element: &ElementRef) -> Result<(), DomError> {
        self.run_unit(scripts::focus(element)).await
    }

    async fn blur(&self, element: &ElementRef) -> Result<(), DomError> {
        self.run_unit(scripts::blur(element)).await
    }

    async fn dispatch(&self, element: &ElementRef, event: DomEvent) -> Result<(), DomError> {
        self.run_unit(scripts::dispatch(element, &event)).await
    }

    async fn set_selection_range(
        &self,
        element: &ElementRef,
        start: usize,
        end: usize,
    ) -> Result<(), DomError> {
        self.run_unit(scripts::set_selection_range(element, start, end))
            .await
    }

    async fn exec_command(&self, command: EditCommand) -> Result<bool, DomError> {
        self.run_as(scripts::exec_command(&command)).await
    }

    async fn set_value(
        &self,
        element: &ElementRef,
        value: &str,
        setter: ValueSetter,
    ) -> Result<(), DomError> {
        self.run_unit(scripts::set_value(element, value, setter))
            .await
    }

    async fn set_text_content(&self, element: &ElementRef, text: &str) -> Result<(), DomError> {
        self.run_unit(scripts::set_text_content(element, text)).await
    }

    async fn reset_value_tracker(
        &self,
        element: &ElementRef,
        previous: &str,
    ) -> Result<bool, DomError> {
        self.run_as(scripts::reset_value_tracker(element, previous))
            .await
    }

    async fn observe(
        &self,
        target: &ObserveTarget,
        options: ObserveOptions,
    ) -> Result<MutationSubscription, DomError> {
        let root = match target {
            ObserveTarget::Body => None,
            ObserveTarget::Element(element) => Some(element),
        };
        let (id, receiver) = self.inner.observers.register();
        if let Err(err) = self.run_unit(scripts::observe(root, id, &options)).await {
            self.inner.observers.remove(id);
            return Err(err);
        }
        debug!(target: "cdp-adapter", observer = id, "mutation observer started");

        let page = self.inner.page.clone();
        let timeout = self.inner.command_timeout;
        let observers = Arc::clone(&self.inner.observers);
        Ok(MutationSubscription::new(receiver, move || {
            observers.remove(id);
            // Disconnect runs on the page asynchronously; without a runtime
            // the observer dies with the page instead.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(err) = evaluate(&page, timeout, scripts::disconnect(id)).await {
                        debug!(target: "cdp-adapter", observer = id, %err, "observer disconnect failed");
                    }
                });
            }
        }))
    }
}
