// SPDX-FileCopyrightText: 2026 Bookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bookline - automated SMS conversation lifecycle for calendar bookings.
//!
//! This is the binary entry point for the Bookline service.

mod serve;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bookline_config::{BooklineConfig, ConfigError};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Bookline - automated SMS conversation lifecycle for calendar bookings.
#[derive(Parser, Debug)]
#[command(name = "bookline", version, about, long_about = None)]
struct Cli {
    /// Explicit path to a bookline.toml (skips the XDG hierarchy).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Bookline service (default).
    Serve,
    /// Load and validate configuration, then exit.
    Check,
}

/// Load configuration, either from the XDG hierarchy or an explicit path.
fn load_config(path: Option<&Path>) -> Result<BooklineConfig, Vec<ConfigError>> {
    match path {
        None => bookline_config::load_and_validate(),
        Some(path) => match bookline_config::load_config_from_path(path) {
            Ok(config) => {
                bookline_config::validation::validate_config(&config)?;
                Ok(config)
            }
            Err(err) => Err(bookline_config::diagnostic::figment_to_config_errors(err)),
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            bookline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level)),
        )
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = serve::run(config).await {
                tracing::error!(error = %e, "bookline exited with error");
                std::process::exit(1);
            }
        }
        Commands::Check => {
            println!(
                "config ok (service.name={}, server={}:{}, storage={})",
                config.service.name,
                config.server.host,
                config.server.port,
                config.storage.database_path
            );
        }
    }
}
