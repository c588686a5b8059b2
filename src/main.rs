//! Layer-7 load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────┐
//!                         │               LOAD BALANCER              │
//!                         │                                          │
//!   Client Request        │  ┌──────────┐    ┌────────────────────┐  │
//!   ──────────────────────┼─▶│   http   │───▶│   load_balancer    │  │
//!                         │  │  server  │    │ pool + round robin │  │
//!                         │  └────┬─────┘    └─────────▲──────────┘  │
//!                         │       │ forward            │ liveness    │
//!                         │       ▼                    │             │
//!   Client Response       │  ┌──────────┐    ┌─────────┴──────────┐  │
//!   ◀─────────────────────┼──│  proxy   │    │  health checker    │  │
//!                         │  └────┬─────┘    │  (TCP probe/tick)  │  │
//!                         │       │          └─────────┬──────────┘  │
//!                         └───────┼────────────────────┼─────────────┘
//!                                 ▼                    ▼
//!                              Backends ◀──────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use l7_balancer::config::{resolve_config, ConfigOverrides};
use l7_balancer::lifecycle::{signals, startup, Shutdown};
use l7_balancer::observability::logging;

#[derive(Parser)]
#[command(name = "l7-balancer")]
#[command(about = "Round-robin HTTP load balancer with active health checks", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "LB_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Backend URL; repeat or comma-separate. Replaces the configured list.
    #[arg(long = "backend", env = "BACKENDS", value_delimiter = ',')]
    backends: Vec<String>,

    /// Log level, overriding the config file.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        bind_address: cli.bind,
        backends: cli.backends,
    };
    let config = match resolve_config(cli.config.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("l7-balancer: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = cli
        .log_level
        .unwrap_or_else(|| config.observability.log_level.clone());
    logging::init_logging(&level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        backends = ?config.backends,
        health_interval_secs = config.health_check.interval_secs,
        probe_timeout_secs = config.health_check.timeout_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    match startup::run(config, shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Load balancer failed");
            ExitCode::FAILURE
        }
    }
}
