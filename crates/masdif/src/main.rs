// SPDX-FileCopyrightText: 2026 Masdif Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Masdif - multi-modal conversational gateway.
//!
//! Binary entry point: loads configuration, installs logging and dispatches
//! to `serve` or `doctor`.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Masdif - multi-modal conversational gateway.
#[derive(Parser, Debug)]
#[command(name = "masdif", version, about, long_about = None)]
struct Cli {
    /// Configuration file. Replaces the standard lookup hierarchy.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway (default).
    Serve,
    /// Check database, dialog engine and TTS reachability once.
    Doctor,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => masdif_config::load_and_validate_path(path),
        None => masdif_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            masdif_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Doctor => match doctor::run_doctor(&config).await {
            Ok(true) => Ok(()),
            Ok(false) => std::process::exit(2),
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("masdif: {e}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn default_directives(level: &str) -> String {
    format!("masdif={level},tower_http={level},warn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn default_filter_scopes_level_to_masdif() {
        let directives = default_directives("debug");
        assert_eq!(directives, "masdif=debug,tower_http=debug,warn");
        assert!(EnvFilter::try_new(&directives).is_ok());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["masdif", "doctor"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Doctor)));

        let cli = Cli::try_parse_from(["masdif", "--config", "/tmp/m.toml", "serve"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/m.toml")));

        let cli = Cli::try_parse_from(["masdif"]).unwrap();
        assert!(cli.command.is_none());
    }
}
