//! Provider aggregation control plane.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────┐   ┌──────────────┐
//!   │ FileBackend  │   │ FileBackend  │   ...
//!   └──────┬───────┘   └──────┬───────┘
//!          │ watch loop       │ watch loop      throttle + dedup + backoff
//!          ▼                  ▼
//!   ┌─────────────────────────────────┐
//!   │     ConfigurationAggregator     │   latest snapshot per provider
//!   │   merge → conflict resolution   │
//!   └───────────────┬─────────────────┘
//!                   ▼
//!        ArcSwap<Configuration> + output file
//! ```

use std::path::PathBuf;
use clap::Parser;

use provider_aggregator::config::load_config;
use provider_aggregator::lifecycle::signals::wait_for_signal;
use provider_aggregator::lifecycle::startup::snapshot_once;
use provider_aggregator::lifecycle::{ControlPlane, Shutdown};
use provider_aggregator::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "control-plane")]
#[command(about = "Aggregates routing configuration from multiple providers", long_about = None)]
struct Cli {
    /// Path to the control plane configuration file.
    #[arg(short, long, default_value = "control-plane.toml")]
    config: PathBuf,

    /// Take one snapshot from every provider, print the merged result and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        providers = config.providers.file.len(),
        strategy = %config.aggregator.strategy,
        "control-plane starting"
    );

    let backends = ControlPlane::backends_from_config(&config);

    if cli.once {
        let merged = snapshot_once(backends, config.aggregator.strategy).await?;
        println!("{}", serde_json::to_string_pretty(&merged)?);
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let running = ControlPlane::new(config).start(backends, &shutdown)?;

    wait_for_signal().await;
    tracing::info!("Shutting down");
    shutdown.trigger();
    running.wait().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
