//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Alms - Donation tracking back office
#[derive(Parser)]
#[command(name = "alms")]
#[command(about = "Donation CSV import and reconciliation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "alms.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import a payment-processor CSV export
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Grace window in days for duplicate-subscription detection
        #[arg(long, default_value = "3")]
        dup_window_days: i64,

        /// Print the import summary as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Manage donors
    Donors {
        #[command(subcommand)]
        action: Option<DonorsAction>,
    },

    /// List donations
    Donations {
        /// Only show donations for this donor id
        #[arg(long)]
        donor: Option<i64>,

        /// Only show donations flagged for review
        #[arg(long)]
        flagged: bool,

        /// Maximum rows to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show database status
    Status,

    /// Start the admin web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a
        /// network. By default the server requires an API key from
        /// ALMS_API_KEYS.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum DonorsAction {
    /// List donors
    List {
        /// Maximum rows to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Merge one donor into another
    Merge {
        /// Donor id to merge away
        source: i64,
        /// Donor id to keep as canonical
        target: i64,
    },

    /// Soft-discard a donor (never hard-deletes)
    Discard {
        /// Donor id
        id: i64,
    },
}
