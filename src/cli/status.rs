use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::context::CliContext;

#[derive(Serialize)]
struct StatusReport {
    connected: bool,
    page_url: String,
}

pub async fn cmd_status(ctx: &CliContext) -> Result<()> {
    let session = ctx.open_session().await?;
    let connected = ctx
        .connector(session.document())
        .is_connected()
        .await
        .context("checking wallet connection")?;

    let report = StatusReport {
        connected,
        page_url: session.page_url().to_string(),
    };
    ctx.output().print(&report, || {
        let state = if report.connected {
            "connected"
        } else {
            "not connected"
        };
        format!("Wallet {state} on {}", report.page_url)
    })
}
