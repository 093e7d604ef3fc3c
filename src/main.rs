//! immuclient - command-line client for immudb

use clap::Parser;
use immuclient::cli::Cli;
use immuclient::client::{Connector, HttpConnector};
use immuclient::config::default_config_paths;
use immuclient::{ImmuclientError, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.debug);

    // The only place that decides the exit status
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Starting immuclient");

    let connector: Arc<dyn Connector> = Arc::new(HttpConnector::default());
    let env = std::env::vars().collect();
    let search_paths = default_config_paths();

    // Dropping the command future on interrupt drops any open session,
    // which releases its connection.
    tokio::select! {
        result = cli.run(env, &search_paths, connector) => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupted, releasing session");
            Err(ImmuclientError::Interrupted)
        }
    }
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "immuclient=debug" } else { "immuclient=warn" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
