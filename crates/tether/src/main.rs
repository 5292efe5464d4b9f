// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tether - session rotation engine tooling.
//!
//! Validates configuration and inspects the sessions and summaries stored
//! for a user.

mod inspect;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tether_config::TetherConfig;

/// Tether - inspect sessions and validate configuration.
#[derive(Parser, Debug)]
#[command(name = "tether", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate the configuration.
    Check,
    /// Show a user's active session and archived sessions.
    Status {
        #[arg(long)]
        user: String,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Print a user's cumulative summary.
    Summary {
        #[arg(long)]
        user: String,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tether_config::load_and_validate_path(path),
        None => tether_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tether_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    let result = match cli.command {
        Commands::Check => {
            print_check(&config);
            Ok(())
        }
        Commands::Status { user, json, plain } => {
            inspect::run_status(&config, &user, json, plain).await
        }
        Commands::Summary { user, json } => inspect::run_summary(&config, &user, json).await,
    };

    if let Err(e) = result {
        eprintln!("tether: {e}");
        std::process::exit(1);
    }
}

fn print_check(config: &TetherConfig) {
    let session = &config.session;
    println!("tether: config OK (agent.name={})", config.agent.name);
    println!("  database:          {}", config.storage.database_path);
    println!("  rotation timeout:  {}h", session.rotation_timeout_hours);
    println!(
        "  context ratios:    soft {:.2}, force {:.2}",
        session.rotation_context_ratio, session.rotation_force_ratio
    );
    println!(
        "  summaries:         {} (recent window {})",
        if session.summary_enabled { "on" } else { "off" },
        session.max_recent_sessions
    );
    println!(
        "  rate limit wait:   {}s",
        config.queue.default_rate_limit_wait_secs
    );
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tether={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
