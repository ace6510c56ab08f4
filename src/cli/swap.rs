use action_flow::{SwapParams, TokenSpec};
use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct SwapArgs {
    /// Symbol of the token to sell
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub from: String,

    /// Symbol of the token to buy
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub to: String,

    /// Amount of the sold token, exactly as it should be typed
    #[arg(long, value_parser = NonEmptyStringValueParser::new())]
    pub amount: String,

    /// Mint/contract address of the sold token, used as its search query
    #[arg(long)]
    pub from_address: Option<String>,

    /// Mint/contract address of the bought token, used as its search query
    #[arg(long)]
    pub to_address: Option<String>,
}

impl SwapArgs {
    pub fn params(&self) -> SwapParams {
        SwapParams {
            from: token(&self.from, self.from_address.as_deref()),
            to: token(&self.to, self.to_address.as_deref()),
            amount: self.amount.trim().to_string(),
        }
    }
}

fn token(symbol: &str, address: Option<&str>) -> TokenSpec {
    let spec = TokenSpec::new(symbol.trim());
    match address.map(str::trim).filter(|address| !address.is_empty()) {
        Some(address) => spec.with_address(address),
        None => spec,
    }
}

#[derive(Serialize)]
struct SwapReport {
    #[serde(flatten)]
    params: SwapParams,
    transaction: String,
}

pub async fn cmd_swap(args: SwapArgs, ctx: &CliContext) -> Result<()> {
    let params = args.params();
    let session = ctx.open_session().await?;
    let exchanger = ctx.exchanger(session.document());

    info!(
        from = %params.from.token,
        to = %params.to.token,
        amount = %params.amount,
        "starting swap"
    );
    let transaction = exchanger.swap(&params).await.with_context(|| {
        format!(
            "swap {} {} -> {} failed",
            params.amount, params.from.token, params.to.token
        )
    })?;

    let report = SwapReport {
        params,
        transaction,
    };
    ctx.output().print(&report, || {
        format!(
            "Swapped {} {} for {}: {}",
            report.params.amount, report.params.from.token, report.params.to.token, report.transaction
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::Commands;
    use crate::cli::CliArgs;
    use clap::Parser;

    fn parse(argv: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(argv)
    }

    #[test]
    fn addresses_become_search_queries() {
        let cli = parse(&[
            "domflow", "swap", "--from", "SOL", "--to", "USDT", "--amount", "1.5",
            "--to-address", "Es9vMFrz",
        ])
        .unwrap();
        let Commands::Swap(args) = cli.command else {
            panic!("expected swap");
        };
        let params = args.params();
        assert_eq!(params.from.search_query(), "SOL");
        assert_eq!(params.to.search_query(), "Es9vMFrz");
        assert_eq!(params.to.token, "USDT");
        assert_eq!(params.amount, "1.5");
    }

    #[test]
    fn blank_address_is_ignored() {
        assert_eq!(token("BONK", Some("  ")), TokenSpec::new("BONK"));
    }

    #[test]
    fn empty_amount_is_rejected() {
        assert!(parse(&["domflow", "swap", "--from", "SOL", "--to", "USDC", "--amount", ""]).is_err());
    }
}
