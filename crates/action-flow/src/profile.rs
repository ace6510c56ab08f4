//! Target site selector sets and workflow timings

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder replaced by the provider name in
/// [`SiteProfile::provider_button`].
pub const PROVIDER_PLACEHOLDER: &str = "{provider}";

/// Selectors describing where the workflows find things on the target site.
///
/// Every field falls back to its default when absent from configuration, so a
/// profile file only needs to list the selectors that differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteProfile {
    pub connect_button: String,
    /// Provider button selector with a `{provider}` placeholder
    pub provider_button: String,
    pub default_provider: String,
    pub provider_modal: String,
    /// Class token present on the provider modal while it is open
    pub modal_open_class: String,

    pub swap_container: String,
    pub from_selector: String,
    pub to_selector: String,
    /// Symbol label inside a currency selector
    pub pair_label: String,
    pub amount_input: String,

    pub token_search: String,
    pub token_list: String,
    pub token_entry: String,
    /// Symbol label inside a token list entry
    pub token_entry_label: String,

    pub swap_button: String,
    pub confirm_button: String,
    pub result_dialog: String,
    pub success_marker: String,
    pub error_marker: String,
    /// Transaction link next to the success marker
    pub result_link: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            connect_button: r#"button[data-testid="connect-wallet"]"#.into(),
            provider_button: r#"button[data-provider="{provider}"]"#.into(),
            default_provider: "Phantom".into(),
            provider_modal: r#"[data-testid="wallet-modal"]"#.into(),
            modal_open_class: "open".into(),
            swap_container: r#"[data-testid="swap-form"]"#.into(),
            from_selector: r#"[data-testid="swap-from"] button[data-testid="token-select"]"#.into(),
            to_selector: r#"[data-testid="swap-to"] button[data-testid="token-select"]"#.into(),
            pair_label: r#"[data-testid="token-symbol"]"#.into(),
            amount_input: r#"[data-testid="swap-from"] input[inputmode="decimal"]"#.into(),
            token_search: r#"input[data-testid="token-search"]"#.into(),
            token_list: r#"[data-testid="token-list"]"#.into(),
            token_entry: r#"[data-testid="token-entry"]"#.into(),
            token_entry_label: r#"[data-testid="token-entry-symbol"]"#.into(),
            swap_button: r#"button[data-testid="swap-button"]"#.into(),
            confirm_button: r#"button[data-testid="confirm-swap"]"#.into(),
            result_dialog: r#"[data-testid="swap-result"]"#.into(),
            success_marker: r#"[data-status="success"]"#.into(),
            error_marker: r#"[data-status="error"]"#.into(),
            result_link: "a[href]".into(),
        }
    }
}

impl SiteProfile {
    /// Selector for the button of `provider`.
    pub fn provider_button(&self, provider: &str) -> String {
        self.provider_button.replace(PROVIDER_PLACEHOLDER, provider)
    }

    /// Human-readable problems with this profile; empty when usable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems: Vec<String> = self
            .selectors()
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| format!("profile.{name} is empty"))
            .collect();
        if !self.provider_button.contains(PROVIDER_PLACEHOLDER) {
            problems.push(format!(
                "profile.provider_button must contain {PROVIDER_PLACEHOLDER}"
            ));
        }
        if self.default_provider.trim().is_empty() {
            problems.push("profile.default_provider is empty".into());
        }
        if self.modal_open_class.split_whitespace().count() != 1 {
            problems.push("profile.modal_open_class must be a single class token".into());
        }
        problems
    }

    fn selectors(&self) -> [(&'static str, &str); 19] {
        [
            ("connect_button", &self.connect_button),
            ("provider_button", &self.provider_button),
            ("provider_modal", &self.provider_modal),
            ("swap_container", &self.swap_container),
            ("from_selector", &self.from_selector),
            ("to_selector", &self.to_selector),
            ("pair_label", &self.pair_label),
            ("amount_input", &self.amount_input),
            ("token_search", &self.token_search),
            ("token_list", &self.token_list),
            ("token_entry", &self.token_entry),
            ("token_entry_label", &self.token_entry_label),
            ("swap_button", &self.swap_button),
            ("confirm_button", &self.confirm_button),
            ("result_dialog", &self.result_dialog),
            ("success_marker", &self.success_marker),
            ("error_marker", &self.error_marker),
            ("result_link", &self.result_link),
            ("modal_open_class", &self.modal_open_class),
        ]
    }
}

/// Timeouts and pauses used by the workflows, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowTimings {
    pub element_timeout_ms: u64,
    pub click_delay_ms: u64,
    pub double_focus_pause_ms: u64,
    pub provider_button_timeout_ms: u64,
    /// Pause after clicking the provider before checking the connection
    pub provider_pause_ms: u64,
    /// Pause after the provider modal closed before re-checking
    pub connect_settle_ms: u64,
    pub modal_close_timeout_ms: u64,
    pub token_list_settle_ms: u64,
    pub amount_settle_ms: u64,
    pub swap_recheck_ms: u64,
    pub confirm_timeout_ms: u64,
    pub result_dialog_timeout_ms: u64,
    pub result_timeout_ms: u64,
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            element_timeout_ms: 5_000,
            click_delay_ms: 100,
            double_focus_pause_ms: 50,
            provider_button_timeout_ms: 5_000,
            provider_pause_ms: 1_000,
            connect_settle_ms: 500,
            modal_close_timeout_ms: 120_000,
            token_list_settle_ms: 500,
            amount_settle_ms: 1_500,
            swap_recheck_ms: 1_000,
            confirm_timeout_ms: 10_000,
            result_dialog_timeout_ms: 30_000,
            result_timeout_ms: 20_000,
        }
    }
}

impl FlowTimings {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay_ms)
    }

    pub fn double_focus_pause(&self) -> Duration {
        Duration::from_millis(self.double_focus_pause_ms)
    }

    pub fn provider_button_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_button_timeout_ms)
    }

    pub fn provider_pause(&self) -> Duration {
        Duration::from_millis(self.provider_pause_ms)
    }

    pub fn connect_settle(&self) -> Duration {
        Duration::from_millis(self.connect_settle_ms)
    }

    pub fn modal_close_timeout(&self) -> Duration {
        Duration::from_millis(self.modal_close_timeout_ms)
    }

    pub fn token_list_settle(&self) -> Duration {
        Duration::from_millis(self.token_list_settle_ms)
    }

    pub fn amount_settle(&self) -> Duration {
        Duration::from_millis(self.amount_settle_ms)
    }

    pub fn swap_recheck(&self) -> Duration {
        Duration::from_millis(self.swap_recheck_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn result_dialog_timeout(&self) -> Duration {
        Duration::from_millis(self.result_dialog_timeout_ms)
    }

    pub fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms)
    }
}
