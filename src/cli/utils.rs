use anyhow::Context;
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::PgStore;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(body)) = (data, response.as_object_mut()) {
                body.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Connect to the configured PostgreSQL database and bring its schema up
/// to date.
pub async fn connect_store(config: &AppConfig) -> anyhow::Result<PgStore> {
    let store = PgStore::connect(&config.database)
        .await
        .context("failed to connect to PostgreSQL")?;
    store.migrate().await.context("failed to apply migrations")?;
    Ok(store)
}
