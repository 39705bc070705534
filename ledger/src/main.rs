// Tonnage Ledger - offline-first payroll tracking for tonnage crews
// Entry point and logging setup

use clap::Parser;
use tonnage_ledger::cli::Cli;
use tonnage_ledger::commands;
use tonnage_ledger::services::ClientConfigService;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The log filter lives in the client config, so read it before logging starts
    let config = ClientConfigService::new(&cli.data_dir).load().await?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Tonnage Ledger {}", env!("CARGO_PKG_VERSION"));

    commands::run(cli).await?;

    Ok(())
}
