//! Token swap workflow

use std::fmt;
use std::sync::Arc;

use action_primitives::{
    click_element, double_focus_with, insert_text_into_element, set_react_input_value,
    wait_for_element,
};
use domflow_core_types::{Document, ElementRef};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, instrument};

use crate::completion::SwapCompletion;
use crate::connector::Connector;
use crate::errors::FlowError;
use crate::profile::{FlowTimings, SiteProfile};
use crate::steps::step;

pub const SWAP_CONTAINER_NOT_FOUND: &str = "Swap container not found";
pub const WALLET_NOT_CONNECTED: &str = "Wallet is not connected";

/// A token by symbol, optionally pinned to its mint/contract address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl TokenSpec {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// What to type into the token search: the address when known.
    pub fn search_query(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.token)
    }

    fn matches(&self, label: &str) -> bool {
        label.trim().eq_ignore_ascii_case(self.token.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapParams {
    pub from: TokenSpec,
    pub to: TokenSpec,
    pub amount: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapSide {
    From,
    To,
}

impl fmt::Display for SwapSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapSide::From => f.write_str("from"),
            SwapSide::To => f.write_str("to"),
        }
    }
}

struct SwapForm {
    from_button: ElementRef,
    to_button: ElementRef,
    amount_input: ElementRef,
}

/// Runs swaps on the host page. Requires a connected wallet.
#[derive(Clone)]
pub struct Exchanger {
    document: Arc<dyn Document>,
    profile: Arc<SiteProfile>,
    timings: FlowTimings,
    connector: Connector,
}

impl Exchanger {
    pub fn new(document: Arc<dyn Document>, profile: Arc<SiteProfile>, timings: FlowTimings) -> Self {
        let connector = Connector::new(document.clone(), profile.clone(), timings.clone());
        Self {
            document,
            profile,
            timings,
            connector,
        }
    }

    /// Swap `params.amount` of `params.from` into `params.to`, resolving with
    /// the transaction URL the host reports.
    #[instrument(
        name = "swap",
        skip(self, params),
        fields(from = %params.from.token, to = %params.to.token, amount = %params.amount)
    )]
    pub async fn swap(&self, params: &SwapParams) -> Result<String, FlowError> {
        if !self.connector.is_connected().await? {
            return Err(FlowError::Precondition(WALLET_NOT_CONNECTED.into()));
        }

        let form = step("locate_form", self.locate_form()).await?;
        step(
            "select_from",
            self.select_token(SwapSide::From, &form.from_button, &params.from),
        )
        .await?;
        step(
            "select_to",
            self.select_token(SwapSide::To, &form.to_button, &params.to),
        )
        .await?;
        step("enter_amount", self.enter_amount(&form.amount_input, &params.amount)).await?;
        let swap_button = step("check_swap_button", self.ready_swap_button()).await?;
        step("submit", self.submit(&swap_button)).await
    }

    fn doc(&self) -> &dyn Document {
        self.document.as_ref()
    }

    async fn locate_form(&self) -> Result<SwapForm, FlowError> {
        let container = self
            .doc()
            .query(&self.profile.swap_container)
            .await?
            .ok_or_else(|| FlowError::ElementNotFound(SWAP_CONTAINER_NOT_FOUND.into()))?;

        Ok(SwapForm {
            from_button: self
                .find_in(&container, &self.profile.from_selector, "From currency selector")
                .await?,
            to_button: self
                .find_in(&container, &self.profile.to_selector, "To currency selector")
                .await?,
            amount_input: self
                .find_in(&container, &self.profile.amount_input, "Amount input")
                .await?,
        })
    }

    async fn find_in(
        &self,
        container: &ElementRef,
        selector: &str,
        what: &str,
    ) -> Result<ElementRef, FlowError> {
        self.doc()
            .query_within(container, selector)
            .await?
            .ok_or_else(|| FlowError::ElementNotFound(format!("{what} not found")))
    }

    async fn current_symbol(&self, selector_button: &ElementRef) -> Result<String, FlowError> {
        let label = self
            .doc()
            .query_within(selector_button, &self.profile.pair_label)
            .await?;
        let text = match label {
            Some(label) => self.doc().text_content(&label).await?,
            None => self.doc().text_content(selector_button).await?,
        };
        Ok(text)
    }

    async fn select_token(
        &self,
        side: SwapSide,
        selector_button: &ElementRef,
        token: &TokenSpec,
    ) -> Result<(), FlowError> {
        let current = self.current_symbol(selector_button).await?;
        if token.matches(&current) {
            info!(%side, token = %token.token, "token already selected");
            return Ok(());
        }

        click_element(self.doc(), Some(selector_button), self.timings.click_delay()).await?;

        let search = wait_for_element(
            &self.document,
            &self.profile.token_search,
            self.timings.element_timeout(),
        )
        .await?
        .ok_or_else(|| FlowError::ElementNotFound("Token search input not found".into()))?;

        if !insert_text_into_element(self.doc(), &search, token.search_query()).await {
            return Err(FlowError::Interaction(format!(
                "Failed to search for token {}",
                token.token
            )));
        }

        let list = wait_for_element(
            &self.document,
            &self.profile.token_list,
            self.timings.element_timeout(),
        )
        .await?
        .ok_or_else(|| FlowError::ElementNotFound("Token list not found".into()))?;
        sleep(self.timings.token_list_settle()).await;

        let entry = self
            .find_entry(&list, token)
            .await?
            .ok_or_else(|| {
                FlowError::ElementNotFound(format!("Token {} not found in list", token.token))
            })?;
        click_element(self.doc(), Some(&entry), self.timings.click_delay()).await?;
        info!(%side, token = %token.token, "token selected");
        Ok(())
    }

    async fn find_entry(
        &self,
        list: &ElementRef,
        token: &TokenSpec,
    ) -> Result<Option<ElementRef>, FlowError> {
        let entries = self
            .doc()
            .query_all_within(list, &self.profile.token_entry)
            .await?;
        debug!(entries = entries.len(), "scanning token list");
        for entry in entries {
            let label = match self
                .doc()
                .query_within(&entry, &self.profile.token_entry_label)
                .await?
            {
                Some(label) => self.doc().text_content(&label).await?,
                None => self.doc().text_content(&entry).await?,
            };
            if token.matches(&label) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    async fn enter_amount(&self, input: &ElementRef, amount: &str) -> Result<(), FlowError> {
        double_focus_with(self.doc(), input, self.timings.double_focus_pause()).await?;
        set_react_input_value(self.doc(), input, amount).await?;
        self.doc().blur(input).await?;
        self.doc().focus(input).await?;
        sleep(self.timings.amount_settle()).await;
        Ok(())
    }

    async fn ready_swap_button(&self) -> Result<ElementRef, FlowError> {
        let button = self.find_swap_button().await?;
        if !self.doc().is_disabled(&button).await? {
            return Ok(button);
        }

        debug!("swap button disabled, rechecking");
        sleep(self.timings.swap_recheck()).await;
        let button = self.find_swap_button().await?;
        if self.doc().is_disabled(&button).await? {
            let text = self.doc().text_content(&button).await?;
            return Err(FlowError::HostValidation(text.trim().to_string()));
        }
        Ok(button)
    }

    async fn find_swap_button(&self) -> Result<ElementRef, FlowError> {
        self.doc()
            .query(&self.profile.swap_button)
            .await?
            .ok_or_else(|| FlowError::ElementNotFound("Swap button not found".into()))
    }

    async fn submit(&self, swap_button: &ElementRef) -> Result<String, FlowError> {
        click_element(self.doc(), Some(swap_button), self.timings.click_delay()).await?;

        let confirm = wait_for_element(
            &self.document,
            &self.profile.confirm_button,
            self.timings.confirm_timeout(),
        )
        .await?
        .ok_or_else(|| FlowError::ElementNotFound("Confirm button not found".into()))?;
        click_element(self.doc(), Some(&confirm), self.timings.click_delay()).await?;

        let dialog = wait_for_element(
            &self.document,
            &self.profile.result_dialog,
            self.timings.result_dialog_timeout(),
        )
        .await?
        .ok_or_else(|| FlowError::ElementNotFound("Transaction result dialog not found".into()))?;

        SwapCompletion::new(
            self.document.clone(),
            &self.profile,
            self.timings.result_timeout(),
        )
        .wait(&dialog)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_takes_over_the_search_query() {
        let plain = TokenSpec::new("BONK");
        assert_eq!(plain.search_query(), "BONK");
        let pinned =
            TokenSpec::new("BONK").with_address("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263");
        assert_eq!(
            pinned.search_query(),
            "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"
        );
    }

    #[test]
    fn symbols_match_case_insensitively() {
        let usdc = TokenSpec::new("usdc");
        assert!(usdc.matches(" USDC\n"));
        assert!(!usdc.matches("USDT"));
    }
}
