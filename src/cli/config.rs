use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use tokio::fs;

use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file merged over defaults)
    Show,

    /// Validate configuration
    Validate,

    /// Print the configuration file location
    Path,
}

#[derive(Serialize)]
struct PathReport {
    path: String,
    exists: bool,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    match args.action {
        ConfigAction::Show => {
            let config = ctx.config();
            match ctx.output() {
                OutputFormat::Human => {
                    println!("Current configuration ({}):", path.display());
                    println!("{}", serde_yaml::to_string(config)?);
                }
                format => format.print(config, String::new)?,
            }
        }
        ConfigAction::Validate => {
            let problems = ctx.config().problems();
            if !problems.is_empty() {
                for problem in &problems {
                    eprintln!("  - {problem}");
                }
                bail!(
                    "{} has {} problem(s)",
                    path.display(),
                    problems.len()
                );
            }
            if fs::try_exists(path).await? {
                println!("Configuration file {} is valid", path.display());
            } else {
                println!(
                    "No configuration file at {}; defaults are valid",
                    path.display()
                );
            }
        }
        ConfigAction::Path => {
            let report = PathReport {
                path: path.display().to_string(),
                exists: fs::try_exists(path).await?,
            };
            ctx.output().print(&report, || {
                if report.exists {
                    report.path.clone()
                } else {
                    format!("{} (not present, defaults in use)", report.path)
                }
            })?;
        }
    }

    Ok(())
}
