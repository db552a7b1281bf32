//! firelocal - run a local Realtime Database emulator for development.
//!
//! Starts the `firebase-server` emulator, optionally followed by an
//! application server, and offers a few commands for poking at the data.

mod cli;
mod commands;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use firelocal_core::{ClientFactory, Config, EmulatorLauncher};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    let config = Config::load().context("Failed to load configuration")?;
    info!(?config, "Configuration loaded");

    let launcher = EmulatorLauncher::from_config(&config);
    let factory = ClientFactory::new(&config);

    commands::dispatch(cli.command, &launcher, &factory).await
}
