use azure_client::{ClientError, DevOpsClient};
use clap::{Parser, Subcommand};
use config::{Config, ConfigError};
use dashboard::errors::DashboardError;
use std::path::PathBuf;
use std::process::ExitCode;
use telemetry::TelemetryError;

mod config;
mod telemetry;

#[derive(Parser)]
#[command(name = "devdash", about = "Azure DevOps dashboard backend")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the dashboard API
    Serve {
        #[arg(long)]
        config: PathBuf,
    },
    /// Load and validate a config file, then exit
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(thiserror::Error, Debug)]
enum DevdashError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("environment variable {0} must hold an Azure DevOps personal access token")]
    MissingToken(String),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        CliCommand::Serve { config } => serve(&config),
        CliCommand::CheckConfig { config } => Config::from_file(&config)
            .map(|_| println!("{} is valid", config.display()))
            .map_err(DevdashError::from),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "devdash exited with an error");
            eprintln!("devdash: {e}");
            ExitCode::FAILURE
        }
    }
}

fn serve(path: &std::path::Path) -> Result<(), DevdashError> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("devdash: ignoring unreadable .env file: {e}");
        }
    }

    let config = Config::from_file(path)?;
    let _sentry = telemetry::init_logging(&config.logging)?;
    if let Some(metrics) = &config.metrics {
        telemetry::init_metrics(metrics)?;
    }

    let token_env = &config.dashboard.token_env;
    let token = std::env::var(token_env)
        .ok()
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| DevdashError::MissingToken(token_env.clone()))?;
    let client = DevOpsClient::new(token)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dashboard::run(config.dashboard, client))?;
    Ok(())
}
