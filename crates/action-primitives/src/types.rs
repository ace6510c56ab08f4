//! Type definitions for action primitives

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default time an element lookup may wait.
pub const DEFAULT_ELEMENT_TIMEOUT_MS: u64 = 5000;

/// Default pause between scrolling an element into view and clicking it.
pub const DEFAULT_CLICK_DELAY_MS: u64 = 100;

/// Default pause between the blur and the second focus of `double_focus`.
pub const DEFAULT_FOCUS_PAUSE_MS: u64 = 50;

/// One or more alternative selectors plus how long to wait for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementQuery {
    pub selectors: Vec<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_ELEMENT_TIMEOUT_MS
}

impl ElementQuery {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selectors: vec![selector.into()],
            timeout_ms: DEFAULT_ELEMENT_TIMEOUT_MS,
        }
    }

    /// Alternatives tried in list order.
    pub fn any<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selectors: selectors.into_iter().map(Into::into).collect(),
            timeout_ms: DEFAULT_ELEMENT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_defaults_to_five_seconds() {
        assert_eq!(ElementQuery::new("button").timeout(), Duration::from_secs(5));

        let parsed: ElementQuery = serde_json::from_str(r#"{"selectors":["a","b"]}"#).unwrap();
        assert_eq!(parsed.selectors, vec!["a", "b"]);
        assert_eq!(parsed.timeout_ms, DEFAULT_ELEMENT_TIMEOUT_MS);
    }
}
