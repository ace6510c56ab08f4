use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::AppConfig;

const LOCAL_CONFIG: &str = "config/domflow.yaml";
const LOCAL_ENV: &str = "config/local.env";

/// Reads `config/local.env` into the process environment without overriding
/// variables that are already set.
pub fn load_local_env_overrides() {
    let path = Path::new(LOCAL_ENV);
    if !path.exists() {
        return;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            for (idx, raw_line) in contents.lines().enumerate() {
                let line = raw_line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    warn!(line = idx + 1, "invalid local.env entry; skipping");
                    continue;
                };
                let key = key.trim();
                if key.is_empty() || env::var(key).is_ok() {
                    continue;
                }
                env::set_var(key, unquote(value.trim()));
            }
            info!(path = %path.display(), "Loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `level`; logs go to
/// stderr so command output on stdout stays machine-readable.
pub fn init_logging(level: &str, debug: bool, json: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    installed.context("Failed to install tracing subscriber")?;

    Ok(())
}

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
}

/// Priority: explicit path > ./config/domflow.yaml > <config_dir>/domflow/config.yaml
pub fn resolve_config_path(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Ok(local);
    }
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("domflow");
    path.push("config.yaml");
    Ok(path)
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let path = resolve_config_path(config_path)?;
    let config = read_config_file(&path).await?;
    Ok(LoadedConfig { config, path })
}

/// Parses the file at `path`; a missing file means defaults.
pub async fn read_config_file(path: &Path) -> Result<AppConfig> {
    if !fs::try_exists(path).await? {
        warn!("Config file not found, using defaults: {}", path.display());
        return Ok(AppConfig::default());
    }

    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let config = if content.trim().is_empty() {
        AppConfig::default()
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?
    };
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

fn unquote(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}
