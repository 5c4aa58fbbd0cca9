//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_status` - Show database status

use std::path::Path;

use anyhow::{Context, Result};
use alms_core::db::Database;

/// Open the database, running migrations if needed
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let _db = open_db(db_path)?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import a payments export: alms import --file payments.csv");
    println!("  2. Start the admin UI: alms serve");

    Ok(())
}

pub fn cmd_status(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;

    let donors = db.count_donors()?;
    let donations = db.count_donations()?;
    let flagged = db.count_flagged_donations()?;

    let size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    println!("📊 Alms status");
    println!("   Database: {} ({} KB)", db_path.display(), size / 1024);
    println!("   Donors: {}", donors);
    println!("   Donations: {}", donations);
    if flagged > 0 {
        println!("   ⚠️  Awaiting review: {}", flagged);
        println!();
        println!("   Run 'alms donations --flagged' to see them.");
    }

    Ok(())
}
