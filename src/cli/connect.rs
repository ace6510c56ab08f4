use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct ConnectArgs {
    /// Wallet provider to pick in the connect dialog (defaults to the profile's)
    #[arg(long)]
    pub provider: Option<String>,
}

#[derive(Serialize)]
struct ConnectReport {
    connected: bool,
    provider: String,
    page_url: String,
}

pub async fn cmd_connect(args: ConnectArgs, ctx: &CliContext) -> Result<()> {
    let session = ctx.open_session().await?;
    let connector = ctx.connector(session.document());
    let provider = args
        .provider
        .unwrap_or_else(|| ctx.config().profile.default_provider.clone());

    info!(%provider, url = session.page_url(), "connecting wallet");
    let connected = connector
        .connect_with(&provider)
        .await
        .context("wallet connection failed")?;

    let report = ConnectReport {
        connected,
        provider,
        page_url: session.page_url().to_string(),
    };
    ctx.output()
        .print(&report, || format!("Wallet connected via {}", report.provider))
}
