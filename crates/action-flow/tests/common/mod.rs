//! A scripted fake DEX page built on `MemoryDocument`.
//!
//! Listeners play the host application: clicking connect opens the wallet
//! modal, clicking a currency selector opens a token picker whose list is
//! filtered by the search input, the amount input enables the swap button,
//! and confirming a swap renders a result dialog that later shows the
//! configured outcome.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use action_flow::{Connector, Exchanger, FlowTimings, SiteProfile};
use dom_memory::{ElementSpec, MemoryDocument};
use domflow_core_types::{Document, DomEventKind, ElementRef};
use parking_lot::Mutex;
use tokio::time::sleep;

pub const TX_URL: &str = "https://tx/0x1";

#[derive(Clone, Debug)]
pub enum ProviderBehavior {
    /// Connects as soon as the provider button is clicked
    Instant,
    /// Closes the modal and connects after a delay
    ViaModal(Duration),
    /// Closes the modal after a delay without connecting
    Rejected(Duration),
    /// Leaves the modal open
    NeverCloses,
    /// The modal has no button for the requested provider
    Missing,
}

#[derive(Clone, Debug)]
pub enum SwapOutcome {
    Success(String),
    Error(String),
    Silent,
}

#[derive(Clone, Debug)]
pub struct DexOptions {
    pub connected: bool,
    pub provider: ProviderBehavior,
    pub swap_form: bool,
    pub from_symbol: String,
    pub to_symbol: String,
    pub tokens: Vec<(String, String, String)>,
    pub balance: f64,
    pub outcome: SwapOutcome,
    pub outcome_delay: Duration,
}

impl Default for DexOptions {
    fn default() -> Self {
        Self {
            connected: true,
            provider: ProviderBehavior::ViaModal(Duration::from_secs(3)),
            swap_form: true,
            from_symbol: "SOL".into(),
            to_symbol: "USDC".into(),
            tokens: vec![
                token("SOL", "Solana", "So11111111111111111111111111111111111111112"),
                token("USDC", "USD Coin", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
                token("USDT", "Tether USD", "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"),
                token("BONK", "Bonk", "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"),
            ],
            balance: 10.0,
            outcome: SwapOutcome::Success(TX_URL.into()),
            outcome_delay: Duration::from_secs(2),
        }
    }
}

fn token(symbol: &str, name: &str, address: &str) -> (String, String, String) {
    (symbol.into(), name.into(), address.into())
}

#[derive(Default)]
struct DexState {
    connect_button: Option<ElementRef>,
    modal: Option<ElementRef>,
    picker: Option<ElementRef>,
    picker_for: Option<ElementRef>,
    list: Option<ElementRef>,
    swap_button: Option<ElementRef>,
    swap_enabled: bool,
    symbol_labels: HashMap<ElementRef, ElementRef>,
    entry_symbols: HashMap<ElementRef, String>,
    searches: Vec<String>,
    amounts: Vec<String>,
}

pub struct FakeDex {
    pub doc: MemoryDocument,
    options: DexOptions,
    state: Arc<Mutex<DexState>>,
}

impl FakeDex {
    pub fn new(options: DexOptions) -> Self {
        let dex = Self {
            doc: MemoryDocument::new(),
            options,
            state: Arc::new(Mutex::new(DexState::default())),
        };
        dex.render();
        dex
    }

    pub fn port(&self) -> Arc<dyn Document> {
        Arc::new(self.doc.clone())
    }

    pub fn connector(&self) -> Connector {
        Connector::new(
            self.port(),
            Arc::new(SiteProfile::default()),
            FlowTimings::default(),
        )
    }

    pub fn exchanger(&self) -> Exchanger {
        Exchanger::new(
            self.port(),
            Arc::new(SiteProfile::default()),
            FlowTimings::default(),
        )
    }

    pub fn searches(&self) -> Vec<String> {
        self.state.lock().searches.clone()
    }

    pub fn amounts(&self) -> Vec<String> {
        self.state.lock().amounts.clone()
    }

    pub fn symbol(&self, side: &str) -> String {
        self.doc
            .find(&format!(
                r#"[data-testid="swap-{side}"] [data-testid="token-symbol"]"#
            ))
            .map(|label| self.doc.text(&label))
            .unwrap_or_default()
    }

    pub fn clicks(&self) -> usize {
        self.doc.events_of(DomEventKind::Click).len()
    }

    fn render(&self) {
        let doc = &self.doc;
        if !self.options.connected {
            let button = doc.append_to_body(
                ElementSpec::new("button")
                    .test_id("connect-wallet")
                    .text("Connect Wallet"),
            );
            self.state.lock().connect_button = Some(button);
        }
        self.install_wallet_listeners();

        if self.options.swap_form {
            self.render_swap_form();
            self.install_swap_listeners();
        }
    }

    fn install_wallet_listeners(&self) {
        let state = self.state.clone();
        let behavior = self.options.provider.clone();
        self.doc
            .on(
                r#"button[data-testid="connect-wallet"]"#,
                DomEventKind::Click,
                move |doc, _| {
                    let mut modal = ElementSpec::new("div")
                        .test_id("wallet-modal")
                        .class("modal open");
                    if !matches!(behavior, ProviderBehavior::Missing) {
                        modal = modal.child(
                            ElementSpec::new("button")
                                .attr("data-provider", "Phantom")
                                .text("Phantom"),
                        );
                    }
                    modal = modal.child(
                        ElementSpec::new("button")
                            .attr("data-provider", "Solflare")
                            .text("Solflare"),
                    );
                    state.lock().modal = Some(doc.append_to_body(modal));
                },
            )
            .unwrap();

        let state = self.state.clone();
        let behavior = self.options.provider.clone();
        self.doc
            .on("[data-provider]", DomEventKind::Click, move |doc, _| {
                let (modal, button) = {
                    let state = state.lock();
                    (state.modal.clone(), state.connect_button.clone())
                };
                let (Some(modal), Some(button)) = (modal, button) else {
                    return;
                };
                match behavior.clone() {
                    ProviderBehavior::Instant => {
                        doc.remove(&modal).unwrap();
                        doc.remove(&button).unwrap();
                    }
                    ProviderBehavior::ViaModal(delay) => {
                        let doc = doc.clone();
                        tokio::spawn(async move {
                            sleep(delay).await;
                            doc.remove(&button).unwrap();
                            doc.remove_class(&modal, "open").unwrap();
                        });
                    }
                    ProviderBehavior::Rejected(delay) => {
                        let doc = doc.clone();
                        tokio::spawn(async move {
                            sleep(delay).await;
                            doc.remove_class(&modal, "open").unwrap();
                        });
                    }
                    ProviderBehavior::NeverCloses | ProviderBehavior::Missing => {}
                }
            })
            .unwrap();
    }

    fn render_swap_form(&self) {
        let side = |name: &str, symbol: &str| {
            let mut spec = ElementSpec::new("div").test_id(format!("swap-{name}")).child(
                ElementSpec::new("button")
                    .test_id("token-select")
                    .child(ElementSpec::new("img").attr("alt", "icon"))
                    .child(ElementSpec::new("span").test_id("token-symbol").text(symbol)),
            );
            if name == "from" {
                spec = spec.child(
                    ElementSpec::new("input")
                        .attr("inputmode", "decimal")
                        .attr("placeholder", "0.00")
                        .with_value_tracker(),
                );
            }
            spec
        };

        self.doc.append_to_body(
            ElementSpec::new("div")
                .test_id("swap-form")
                .child(side("from", &self.options.from_symbol))
                .child(side("to", &self.options.to_symbol))
                .child(
                    ElementSpec::new("button")
                        .test_id("swap-button")
                        .attr("disabled", "")
                        .text("Enter an amount"),
                ),
        );

        let mut state = self.state.lock();
        for name in ["from", "to"] {
            let button = self
                .doc
                .find(&format!(
                    r#"[data-testid="swap-{name}"] [data-testid="token-select"]"#
                ))
                .unwrap();
            let label = self
                .doc
                .find(&format!(
                    r#"[data-testid="swap-{name}"] [data-testid="token-symbol"]"#
                ))
                .unwrap();
            state.symbol_labels.insert(button, label);
        }
        state.swap_button = self.doc.find(r#"[data-testid="swap-button"]"#);
    }

    fn install_swap_listeners(&self) {
        let doc = &self.doc;

        let state = self.state.clone();
        doc.on(
            r#"button[data-testid="token-select"]"#,
            DomEventKind::Click,
            move |doc, context| {
                let picker = doc.append_to_body(
                    ElementSpec::new("div").test_id("token-picker").child(
                        ElementSpec::new("input")
                            .test_id("token-search")
                            .attr("type", "text")
                            .with_value_tracker(),
                    ),
                );
                let mut state = state.lock();
                state.picker = Some(picker);
                state.picker_for = Some(context.current_target.clone());
            },
        )
        .unwrap();

        let state = self.state.clone();
        let tokens = self.options.tokens.clone();
        doc.on_value_change(
            r#"input[data-testid="token-search"]"#,
            move |doc, _, query| {
                let mut state = state.lock();
                state.searches.push(query.to_string());
                if let Some(list) = state.list.take() {
                    let _ = doc.remove(&list);
                }
                let Some(picker) = state.picker.clone() else {
                    return;
                };

                let needle = query.trim().to_ascii_lowercase();
                let matches: Vec<_> = tokens
                    .iter()
                    .filter(|(symbol, name, address)| {
                        symbol.to_ascii_lowercase().contains(&needle)
                            || name.to_ascii_lowercase().contains(&needle)
                            || address.to_ascii_lowercase() == needle
                    })
                    .collect();

                let list = doc
                    .append(&picker, ElementSpec::new("ul").test_id("token-list"))
                    .unwrap();
                for (symbol, name, _) in matches {
                    let entry = doc
                        .append(
                            &list,
                            ElementSpec::new("li")
                                .test_id("token-entry")
                                .child(
                                    ElementSpec::new("span")
                                        .test_id("token-entry-symbol")
                                        .text(symbol.as_str()),
                                )
                                .child(
                                    ElementSpec::new("span")
                                        .class("token-name")
                                        .text(name.as_str()),
                                ),
                        )
                        .unwrap();
                    state.entry_symbols.insert(entry, symbol.clone());
                }
                state.list = Some(list);
            },
        )
        .unwrap();

        let state = self.state.clone();
        doc.on(
            r#"[data-testid="token-entry"]"#,
            DomEventKind::Click,
            move |doc, context| {
                let mut state = state.lock();
                let Some(symbol) = state.entry_symbols.get(&context.current_target).cloned()
                else {
                    return;
                };
                let picker_for = state.picker_for.take();
                if let Some(label) =
                    picker_for.and_then(|button| state.symbol_labels.get(&button).cloned())
                {
                    doc.set_text(&label, &symbol).unwrap();
                }
                if let Some(picker) = state.picker.take() {
                    doc.remove(&picker).unwrap();
                }
                state.list = None;
                state.entry_symbols.clear();
            },
        )
        .unwrap();

        let state = self.state.clone();
        let balance = self.options.balance;
        let from_symbol = self.options.from_symbol.clone();
        doc.on_value_change(
            r#"[data-testid="swap-from"] input"#,
            move |doc, _, value| {
                let mut state = state.lock();
                state.amounts.push(value.to_string());
                let Some(button) = state.swap_button.clone() else {
                    return;
                };
                match value.parse::<f64>() {
                    Ok(amount) if amount > 0.0 && amount <= balance => {
                        doc.remove_attribute(&button, "disabled").unwrap();
                        doc.set_text(&button, "Swap").unwrap();
                        state.swap_enabled = true;
                    }
                    Ok(amount) if amount > balance => {
                        doc.set_attribute(&button, "disabled", "").unwrap();
                        doc.set_text(&button, &format!("Insufficient {from_symbol} balance"))
                            .unwrap();
                        state.swap_enabled = false;
                    }
                    _ => {
                        doc.set_attribute(&button, "disabled", "").unwrap();
                        doc.set_text(&button, "Enter an amount").unwrap();
                        state.swap_enabled = false;
                    }
                }
            },
        )
        .unwrap();

        let state = self.state.clone();
        doc.on(
            r#"button[data-testid="swap-button"]"#,
            DomEventKind::Click,
            move |doc, _| {
                if !state.lock().swap_enabled {
                    return;
                }
                doc.append_to_body(
                    ElementSpec::new("button")
                        .test_id("confirm-swap")
                        .text("Confirm Swap"),
                );
            },
        )
        .unwrap();

        let outcome = self.options.outcome.clone();
        let delay = self.options.outcome_delay;
        doc.on(
            r#"button[data-testid="confirm-swap"]"#,
            DomEventKind::Click,
            move |doc, context| {
                doc.remove(&context.current_target).unwrap();
                let dialog = doc.append_to_body(
                    ElementSpec::new("div")
                        .test_id("swap-result")
                        .attr("role", "dialog")
                        .child(ElementSpec::new("h2").text("Processing transaction")),
                );
                let doc = doc.clone();
                let outcome = outcome.clone();
                tokio::spawn(async move {
                    sleep(delay).await;
                    let body = match outcome {
                        SwapOutcome::Success(url) => ElementSpec::new("div")
                            .child(
                                ElementSpec::new("p")
                                    .attr("data-status", "success")
                                    .text("Swap successful"),
                            )
                            .child(ElementSpec::new("a").attr("href", url).text("View transaction")),
                        SwapOutcome::Error(message) => ElementSpec::new("div").child(
                            ElementSpec::new("p")
                                .attr("data-status", "error")
                                .text(message),
                        ),
                        SwapOutcome::Silent => return,
                    };
                    let _ = doc.append(&dialog, body);
                });
            },
        )
        .unwrap();
    }
}
