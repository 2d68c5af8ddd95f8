use crate::cli::utils::{connect_store, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let store = connect_store(&config).await?;
    store.close().await;
    output_success(output_format, "Migrations applied", None)
}
