//! dotnet-workflow CLI - runs a configured .NET build step.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dotnet_workflow::services::executor::ProcessCommandLineExecutor;
use dotnet_workflow::services::properties::{
    AgentPropertiesProvider, DotnetPropertiesProvider, MonoPropertiesProvider, PropertiesAggregator,
};
use dotnet_workflow::services::runner::WorkflowRunner;
use dotnet_workflow::RunnerSettings;
use dotnet_workflow_tools::{DotnetToolResolver, DotnetVersionParser};

#[derive(Parser)]
#[command(name = "dotnet-workflow")]
#[command(about = "Compose and run .NET build steps")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the configured build step
    Run {
        /// Settings file; ~/.dotnet-workflow/runner.toml when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the detected agent properties
    Properties {
        /// Settings file; ~/.dotnet-workflow/runner.toml when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print as a JSON object
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("dotnet_workflow=debug,info")
        } else {
            EnvFilter::new("dotnet_workflow=info,warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run { config } => run(config).await,
        Commands::Properties { config, json } => properties(config, json).await,
    }
}

async fn run(config: Option<PathBuf>) -> Result<ExitCode> {
    let settings = RunnerSettings::load_or_default(config.as_deref()).context("Failed to load settings")?;
    let runner = WorkflowRunner::new(settings);

    let interrupt = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            interrupt.cancel();
        }
    });

    let summary = runner.run().await?;
    Ok(if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn properties(config: Option<PathBuf>, json: bool) -> Result<ExitCode> {
    let settings = RunnerSettings::load_or_default(config.as_deref()).context("Failed to load settings")?;
    let executor = Arc::new(ProcessCommandLineExecutor::new());
    let parser = Arc::new(DotnetVersionParser);

    let providers: Vec<Arc<dyn AgentPropertiesProvider>> = vec![
        Arc::new(DotnetPropertiesProvider::new(
            Arc::new(DotnetToolResolver::new().with_path(settings.dotnet_path.clone())),
            executor.clone(),
            parser.clone(),
        )),
        Arc::new(MonoPropertiesProvider::new(executor, parser)),
    ];

    let properties = PropertiesAggregator::new(providers)
        .with_max_parallel(settings.max_parallel_providers)
        .aggregate()
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&properties)?);
    } else {
        for (name, value) in properties {
            println!("{}={}", name, value);
        }
    }
    Ok(ExitCode::SUCCESS)
}
