use super::config::cmd_config;
use super::connect::cmd_connect;
use super::env::CliArgs;
use super::status::cmd_status;
use super::swap::cmd_swap;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Connect(args) => cmd_connect(args, ctx).await,
        Commands::Swap(args) => cmd_swap(args, ctx).await,
        Commands::Status => cmd_status(ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
