use std::path::{Path, PathBuf};
use std::sync::Arc;

use action_flow::{Connector, Exchanger, SiteProfile};
use anyhow::{Context, Result};
use cdp_adapter::CdpSession;
use domflow_core_types::Document;

use super::output::OutputFormat;
use crate::config::AppConfig;

pub struct CliContext {
    config: Arc<AppConfig>,
    config_path: PathBuf,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: AppConfig, config_path: PathBuf, output: OutputFormat) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            output,
        }
    }

    pub fn config(&self) -> &AppConfig {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn output(&self) -> &OutputFormat {
        &self.output
    }

    /// Attaches to the configured browser tab.
    pub async fn open_session(&self) -> Result<CdpSession> {
        CdpSession::connect(&self.config.cdp)
            .await
            .with_context(|| format!("attaching to {}", self.config.cdp.ws_url))
    }

    pub fn connector(&self, document: Arc<dyn Document>) -> Connector {
        Connector::new(document, self.profile(), self.config.timings.clone())
    }

    pub fn exchanger(&self, document: Arc<dyn Document>) -> Exchanger {
        Exchanger::new(document, self.profile(), self.config.timings.clone())
    }

    fn profile(&self) -> Arc<SiteProfile> {
        Arc::new(self.config.profile.clone())
    }
}
