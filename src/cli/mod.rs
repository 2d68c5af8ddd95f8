pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "onboarding-api")]
#[command(about = "Onboarding questionnaire API - server and maintenance commands")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Keep all data in process memory instead of PostgreSQL")]
        in_memory: bool,
        #[arg(long, help = "Load the demo accounts before serving")]
        seed: bool,
        #[arg(long, help = "Listen port (overrides ONBOARDING_API_PORT / PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Apply database migrations")]
    Migrate,

    #[command(about = "Load demo accounts and questionnaire answers")]
    Seed {
        #[arg(long, help = "YAML fixture file (defaults to the bundled demo data)")]
        file: Option<PathBuf>,
        #[arg(long, help = "Delete every identity and response first")]
        reset: bool,
    },

    #[command(about = "Recompute every completion flag from stored responses")]
    Reconcile,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Serve { in_memory, seed, port } => commands::serve::handle(in_memory, seed, port).await,
        Commands::Migrate => commands::migrate::handle(output_format).await,
        Commands::Seed { file, reset } => commands::seed::handle(file, reset, output_format).await,
        Commands::Reconcile => commands::reconcile::handle(output_format).await,
    }
}
