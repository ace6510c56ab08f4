use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use domflow_cli::cli::context::CliContext;
use domflow_cli::cli::output::OutputFormat;
use domflow_cli::cli::runtime::read_config_file;
use domflow_cli::cli::load_config;
use domflow_cli::AppConfig;
use dom_memory::{ElementSpec, MemoryDocument};
use domflow_core_types::{Document, DomEventKind};
use tempfile::tempdir;

const PROFILE_YAML: &str = r##"
cdp:
  ws_url: ws://127.0.0.1:9333/devtools/browser/abc
  page_url_contains: jup.ag
timings:
  provider_pause_ms: 250
profile:
  connect_button: "#wallet-connect"
  provider_button: 'button[data-wallet="{provider}"]'
  default_provider: Solflare
"##;

#[tokio::test]
async fn explicit_file_overrides_only_listed_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("domflow.yaml");
    fs::write(&path, PROFILE_YAML).unwrap();

    let loaded = load_config(Some(&path)).await.unwrap();
    assert_eq!(loaded.path, path);

    let config = loaded.config;
    assert_eq!(config.cdp.page_url_contains.as_deref(), Some("jup.ag"));
    assert_eq!(config.cdp.command_timeout_ms, 10_000);
    assert_eq!(config.timings.provider_pause_ms, 250);
    assert_eq!(config.timings.result_timeout_ms, 20_000);
    assert_eq!(config.profile.connect_button, "#wallet-connect");
    assert_eq!(
        config.profile.provider_button("Solflare"),
        r#"button[data-wallet="Solflare"]"#
    );
    assert_eq!(config.profile.swap_button, AppConfig::default().profile.swap_button);
    assert!(config.problems().is_empty());
}

#[tokio::test]
async fn missing_file_means_defaults() {
    let dir = tempdir().unwrap();
    let path: PathBuf = dir.path().join("absent.yaml");

    let loaded = load_config(Some(&path)).await.unwrap();
    assert_eq!(loaded.config, AppConfig::default());
    assert_eq!(loaded.path, path);
}

#[tokio::test]
async fn empty_file_means_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.yaml");
    fs::write(&path, "\n").unwrap();

    assert_eq!(read_config_file(&path).await.unwrap(), AppConfig::default());
}

#[tokio::test]
async fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "timings: [not, a, map]\n").unwrap();

    let err = load_config(Some(&path)).await.unwrap_err();
    assert!(format!("{err:#}").contains("parsing"));
}

#[tokio::test]
async fn invalid_values_are_reported_by_validation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("invalid.yaml");
    fs::write(
        &path,
        "cdp:\n  ws_url: ftp://nowhere\nprofile:\n  provider_button: button.wallet\n",
    )
    .unwrap();

    let config = load_config(Some(&path)).await.unwrap().config;
    let problems = config.problems();
    assert_eq!(problems.len(), 2, "{problems:?}");
    assert!(problems[0].starts_with("cdp:"));
    assert!(problems[1].contains("{provider}"));
}

#[tokio::test(start_paused = true)]
async fn configured_profile_drives_the_connector() {
    let config: AppConfig = serde_yaml_from(PROFILE_YAML);
    let ctx = CliContext::new(config, PathBuf::from("domflow.yaml"), OutputFormat::Human);

    let doc = MemoryDocument::new();
    let connect = doc.append_to_body(ElementSpec::new("button").attr("id", "wallet-connect"));
    doc.on("#wallet-connect", DomEventKind::Click, |doc, _| {
        doc.append_to_body(
            ElementSpec::new("button")
                .attr("data-wallet", "Solflare")
                .text("Solflare"),
        );
    })
    .unwrap();
    let connect_button = connect.clone();
    doc.on(r#"button[data-wallet="Solflare"]"#, DomEventKind::Click, move |doc, _| {
        doc.remove(&connect_button).unwrap();
    })
    .unwrap();

    let port: Arc<dyn Document> = Arc::new(doc.clone());
    let connector = ctx.connector(port);
    assert!(!connector.is_connected().await.unwrap());
    assert_eq!(connector.connect().await, Ok(true));
    assert!(!doc.is_attached(&connect));
}

fn serde_yaml_from(raw: &str) -> AppConfig {
    serde_yaml::from_str(raw).unwrap()
}
