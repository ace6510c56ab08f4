//! Application configuration
//!
//! One YAML document with three sections: where the browser is (`cdp`), how
//! long the workflows wait (`timings`) and where they find things on the page
//! (`profile`). Every field has a default, so an empty file is valid.

use action_flow::{FlowTimings, SiteProfile};
use cdp_adapter::CdpConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cdp: CdpConfig,
    pub timings: FlowTimings,
    pub profile: SiteProfile,
}

impl AppConfig {
    /// Everything wrong with this configuration; empty when usable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if let Err(err) = self.cdp.validate() {
            problems.push(format!("cdp: {err}"));
        }
        let timings = [
            ("element_timeout_ms", self.timings.element_timeout_ms),
            ("modal_close_timeout_ms", self.timings.modal_close_timeout_ms),
            ("result_timeout_ms", self.timings.result_timeout_ms),
        ];
        problems.extend(
            timings
                .iter()
                .filter(|(_, value)| *value == 0)
                .map(|(name, _)| format!("timings.{name} must be positive")),
        );
        problems.extend(self.profile.problems());
        problems
    }
}
