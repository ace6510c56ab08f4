use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::Browser;
use chromiumoxide::handler::Handler;
use chromiumoxide::Page;
use domflow_core_types::Document;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, instrument};

use crate::config::CdpConfig;
use crate::document::CdpDocument;
use crate::error::{AdapterError, AdapterErrorKind};

const TARGET_POLL: Duration = Duration::from_millis(100);

/// Live browser connection with the page the workflows drive.
///
/// Dropping the session stops the protocol handler; the browser itself keeps
/// running since it was not launched by us.
pub struct CdpSession {
    _browser: Browser,
    handler: JoinHandle<()>,
    document: CdpDocument,
    page_url: String,
}

impl CdpSession {
    /// Connects to the DevTools endpoint and attaches to the configured tab.
    #[instrument(skip_all, fields(endpoint = %config.ws_url))]
    pub async fn connect(config: &CdpConfig) -> Result<Self, AdapterError> {
        config.validate()?;

        let (mut browser, handler) = Browser::connect(config.ws_url.clone())
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;
        let handler = spawn_handler(handler);

        browser
            .fetch_targets()
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;

        let (page, page_url) =
            match select_page(&browser, config.page_url_contains.as_deref(), config.command_timeout())
                .await
            {
                Ok(found) => found,
                Err(err) => {
                    handler.abort();
                    return Err(err);
                }
            };

        let document = match CdpDocument::attach(page, config.command_timeout()).await {
            Ok(document) => document,
            Err(err) => {
                handler.abort();
                return Err(AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()));
            }
        };
        info!(target: "cdp-adapter", url = %page_url, "attached to page");

        Ok(Self {
            _browser: browser,
            handler,
            document,
            page_url,
        })
    }

    pub fn document(&self) -> Arc<dyn Document> {
        Arc::new(self.document.clone())
    }

    pub fn cdp_document(&self) -> &CdpDocument {
        &self.document
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(result) = handler.next().await {
            if let Err(err) = result {
                error!(target: "cdp-adapter", %err, "chromiumoxide handler error");
            }
        }
        debug!(target: "cdp-adapter", "handler stream ended");
    })
}

/// Page targets attach asynchronously after `fetch_targets`, so the list is
/// polled until a match shows up or the command timeout passes.
async fn select_page(
    browser: &Browser,
    filter: Option<&str>,
    timeout: Duration,
) -> Result<(Page, String), AdapterError> {
    let deadline = Instant::now() + timeout;
    loop {
        let pages = browser
            .pages()
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;
        let mut urls = Vec::with_capacity(pages.len());
        for page in &pages {
            let url = page
                .url()
                .await
                .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?
                .unwrap_or_default();
            urls.push(url);
        }
        if let Some(index) = pick_page(&urls, filter) {
            let url = urls.swap_remove(index);
            if let Some(page) = pages.into_iter().nth(index) {
                return Ok((page, url));
            }
        }
        if Instant::now() >= deadline {
            let hint = match filter {
                Some(filter) => format!("no page url contains '{filter}' among {urls:?}"),
                None => "browser has no open pages".to_string(),
            };
            return Err(AdapterError::new(AdapterErrorKind::TargetNotFound).with_hint(hint));
        }
        sleep(TARGET_POLL).await;
    }
}

/// First page whose URL contains `filter`; without a filter, the first page
/// that is not an internal or blank tab.
pub fn pick_page(urls: &[String], filter: Option<&str>) -> Option<usize> {
    match filter {
        Some(filter) => urls.iter().position(|url| url.contains(filter)),
        None => urls
            .iter()
            .position(|url| !is_internal(url))
            .or_else(|| (!urls.is_empty()).then_some(0)),
    }
}

fn is_internal(url: &str) -> bool {
    url.is_empty()
        || url == "about:blank"
        || url.starts_with("chrome://")
        || url.starts_with("devtools://")
        || url.starts_with("chrome-extension://")
}
