use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AdapterError, AdapterErrorKind};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:9222";

/// Where to find the browser and how long a single protocol command may take.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdpConfig {
    /// DevTools endpoint. Either the browser websocket
    /// (`ws://.../devtools/browser/...`) or the HTTP debugging address.
    pub ws_url: String,
    /// Attach to the first page whose URL contains this string.
    pub page_url_contains: Option<String>,
    pub command_timeout_ms: u64,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            ws_url: resolve_endpoint_default(),
            page_url_contains: None,
            command_timeout_ms: 10_000,
        }
    }
}

impl CdpConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), AdapterError> {
        let url = Url::parse(&self.ws_url).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Config)
                .with_hint(format!("ws_url '{}': {err}", self.ws_url))
        })?;
        if !matches!(url.scheme(), "ws" | "wss" | "http" | "https") {
            return Err(AdapterError::new(AdapterErrorKind::Config)
                .with_hint(format!("unsupported ws_url scheme '{}'", url.scheme())));
        }
        if self.command_timeout_ms == 0 {
            return Err(AdapterError::new(AdapterErrorKind::Config)
                .with_hint("command_timeout_ms must be positive"));
        }
        Ok(())
    }
}

fn resolve_endpoint_default() -> String {
    match env::var("DOMFLOW_CDP_URL") {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => DEFAULT_ENDPOINT.to_string(),
    }
}
