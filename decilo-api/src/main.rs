//! Decilo CLI Entry Point
//!
//! Loads configuration from the environment, builds the engine against the
//! configured backend and runs one subcommand.

use clap::Parser;
use decilo_api::cli::Cli;
use decilo_api::{init_tracing, ApiError, AppState, PortalConfig, TelemetryConfig};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(output) => println!("{}", output),
        Err(err) => {
            let rendered = serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string());
            eprintln!("{}", rendered);
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> Result<String, ApiError> {
    init_tracing(&TelemetryConfig::default())?;
    let config = PortalConfig::from_env()?;

    let state = AppState::from_config(&config).await?;
    tracing::debug!(command = ?cli.command, "Executing command");
    cli.execute(&state.api).await
}
