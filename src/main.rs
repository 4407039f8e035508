//! Workspace Migrator - command line entry point
//!
//! Replays an export file into a target workspace.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use workspace_migrator::{
    events::TracingEmitter,
    export::JsonExport,
    migration::{MigrationOrchestrator, RunContext},
    remote::HttpRemoteApi,
    Config,
};

#[derive(Parser)]
#[command(name = "migrator")]
#[command(about = "Migrate a project-management export into a target workspace")]
struct Cli {
    /// Path to the YAML config file (defaults to ./migrator.yaml)
    #[arg(short, long, env = "MIGRATOR_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full migration pipeline
    Run {
        /// Export file to read (overrides config and MIGRATOR_EXPORT_PATH)
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Target organization / workspace id
        #[arg(short, long)]
        organization: Option<String>,

        /// Maximum in-flight operations per phase
        #[arg(long)]
        concurrency: Option<usize>,

        /// Target API base URL
        #[arg(long)]
        api_url: Option<String>,

        /// Print the final report as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Log every item as it starts and finishes
        #[arg(long)]
        progress: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,workspace_migrator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            export,
            organization,
            concurrency,
            api_url,
            json,
            progress,
        } => {
            if let Some(path) = export {
                config.export_path = path;
            }
            if let Some(id) = organization {
                config.organization_id = Some(id);
            }
            if let Some(n) = concurrency {
                config.concurrency = n;
            }
            if let Some(url) = api_url {
                config.api_url = url;
            }
            run_migration(config, json, progress).await
        }
    }
}

async fn run_migration(config: Config, json: bool, progress: bool) -> Result<()> {
    let settings = config.run_settings()?;
    let export = Arc::new(JsonExport::new(&config.export_path));
    tracing::info!(
        export = %export.path().display(),
        api_url = %config.api_url,
        "Migrating into workspace {}",
        settings.workspace
    );

    let remote = Arc::new(HttpRemoteApi::new(&config.api_url, config.access_token.clone())?);
    let mut ctx = RunContext::new(settings, remote);
    if progress {
        ctx = ctx.with_events(Arc::new(TracingEmitter));
    }

    let report = MigrationOrchestrator::new(export, ctx).run().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
