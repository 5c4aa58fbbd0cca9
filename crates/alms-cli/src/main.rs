//! Alms CLI - Donation tracking back office
//!
//! Usage:
//!   alms init                   Initialize database
//!   alms import --file CSV      Import a payment-processor export
//!   alms donors list            List donors
//!   alms serve --port 3000      Start the admin web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Import {
            file,
            dup_window_days,
            json,
        } => commands::cmd_import(&cli.db, &file, dup_window_days, json),
        Commands::Donors { action } => {
            let db = commands::open_db(&cli.db)?;
            match action.unwrap_or(DonorsAction::List { limit: 20 }) {
                DonorsAction::List { limit } => commands::cmd_donors_list(&db, limit),
                DonorsAction::Merge { source, target } => {
                    commands::cmd_donors_merge(&db, source, target)
                }
                DonorsAction::Discard { id } => commands::cmd_donors_discard(&db, id),
            }
        }
        Commands::Donations {
            donor,
            flagged,
            limit,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_donations_list(&db, donor, flagged, limit)
        }
        Commands::Status => commands::cmd_status(&cli.db),
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => commands::cmd_serve(&cli.db, &host, port, no_auth, static_dir.as_deref()).await,
    }
}
