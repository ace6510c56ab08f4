//! Wallet connection workflow

use std::sync::Arc;

use action_primitives::{click_element, wait_for_element};
use domflow_core_types::{Document, ElementRef};
use tokio::time::sleep;
use tracing::{debug, info, instrument};

use crate::completion::ConnectorCompletion;
use crate::errors::FlowError;
use crate::profile::{FlowTimings, SiteProfile};
use crate::steps::step;

pub const CONNECT_BUTTON_NOT_FOUND: &str = "Connect button not found";
pub const CONNECTION_INCOMPLETE: &str = "Wallet connection was not completed";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectState {
    Idle,
    AwaitingConnectClick,
    AwaitingProviderButton,
    AwaitingModalClose { provider_button: ElementRef },
    Terminal,
}

impl ConnectState {
    fn name(&self) -> &'static str {
        match self {
            ConnectState::Idle => "idle",
            ConnectState::AwaitingConnectClick => "awaiting_connect_click",
            ConnectState::AwaitingProviderButton => "awaiting_provider_button",
            ConnectState::AwaitingModalClose { .. } => "awaiting_modal_close",
            ConnectState::Terminal => "terminal",
        }
    }
}

/// Connects the host page to a wallet provider.
#[derive(Clone)]
pub struct Connector {
    document: Arc<dyn Document>,
    profile: Arc<SiteProfile>,
    timings: FlowTimings,
}

impl Connector {
    pub fn new(document: Arc<dyn Document>, profile: Arc<SiteProfile>, timings: FlowTimings) -> Self {
        Self {
            document,
            profile,
            timings,
        }
    }

    /// Connected means the page no longer offers a connect button.
    pub async fn is_connected(&self) -> Result<bool, FlowError> {
        Ok(!self.document.exists(&self.profile.connect_button).await?)
    }

    /// Connect using the profile's default provider.
    pub async fn connect(&self) -> Result<bool, FlowError> {
        let provider = self.profile.default_provider.clone();
        self.connect_with(&provider).await
    }

    /// Connect using `provider`. Resolves `Ok(true)` once connected; every
    /// other outcome is an error.
    #[instrument(name = "connect", skip(self))]
    pub async fn connect_with(&self, provider: &str) -> Result<bool, FlowError> {
        let mut state = ConnectState::Idle;
        loop {
            debug!(state = state.name(), "connect state");
            state = match state {
                ConnectState::Idle => {
                    if self.is_connected().await? {
                        info!("wallet already connected");
                        ConnectState::Terminal
                    } else {
                        ConnectState::AwaitingConnectClick
                    }
                }
                ConnectState::AwaitingConnectClick => {
                    step("click_connect", self.click_connect()).await?;
                    ConnectState::AwaitingProviderButton
                }
                ConnectState::AwaitingProviderButton => {
                    let provider_button =
                        step("find_provider", self.find_provider_button(provider)).await?;
                    ConnectState::AwaitingModalClose { provider_button }
                }
                ConnectState::AwaitingModalClose { provider_button } => {
                    step("await_modal_close", self.complete(&provider_button)).await?;
                    ConnectState::Terminal
                }
                ConnectState::Terminal => return Ok(true),
            };
        }
    }

    async fn click_connect(&self) -> Result<(), FlowError> {
        let button = self
            .document
            .query(&self.profile.connect_button)
            .await?
            .ok_or_else(|| FlowError::ElementNotFound(CONNECT_BUTTON_NOT_FOUND.into()))?;
        click_element(
            self.document.as_ref(),
            Some(&button),
            self.timings.click_delay(),
        )
        .await?;
        Ok(())
    }

    async fn find_provider_button(&self, provider: &str) -> Result<ElementRef, FlowError> {
        let selector = self.profile.provider_button(provider);
        wait_for_element(
            &self.document,
            &selector,
            self.timings.provider_button_timeout(),
        )
        .await?
        .ok_or_else(|| FlowError::ElementNotFound(format!("{provider} wallet button not found")))
    }

    async fn complete(&self, provider_button: &ElementRef) -> Result<(), FlowError> {
        click_element(
            self.document.as_ref(),
            Some(provider_button),
            self.timings.click_delay(),
        )
        .await?;
        sleep(self.timings.provider_pause()).await;
        if self.is_connected().await? {
            info!("wallet connected without modal");
            return Ok(());
        }

        let Some(modal) = wait_for_element(
            &self.document,
            &self.profile.provider_modal,
            self.timings.element_timeout(),
        )
        .await?
        else {
            return if self.is_connected().await? {
                Ok(())
            } else {
                Err(FlowError::ElementNotFound("Wallet modal not found".into()))
            };
        };

        let completion = ConnectorCompletion::new(
            self.document.clone(),
            &self.profile,
            self.timings.connect_settle(),
            self.timings.modal_close_timeout(),
        );
        if completion.wait(&modal).await? {
            Ok(())
        } else {
            Err(FlowError::Incomplete(CONNECTION_INCOMPLETE.into()))
        }
    }
}
