use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    domflow_cli::cli::app::run().await
}
