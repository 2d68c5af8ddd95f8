use serde_json::json;
use tracing::info;

use crate::cli::utils::{connect_store, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::Store;

/// Repair completion flags left out of sync by a failed cascade write.
pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let store = connect_store(&config).await?;

    let changed = store.reconcile_completion_flags().await?;
    store.close().await;

    info!("Reconciled completion flags: {} changed", changed);
    output_success(
        output_format,
        &format!("Reconciled completion flags ({} changed)", changed),
        Some(json!({ "changed": changed })),
    )
}
