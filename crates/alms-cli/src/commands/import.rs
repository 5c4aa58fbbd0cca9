//! Import command implementation

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use alms_core::import::{ImportConfig, ImportResult, Importer};

use super::open_db;

pub fn cmd_import(db_path: &Path, file: &Path, dup_window_days: i64, json: bool) -> Result<()> {
    let db = open_db(db_path)?;
    debug!(db = %db_path.display(), file = %file.display(), dup_window_days, "Starting import");

    if !json {
        println!("📥 Importing {}...", file.display());
    }

    let importer = Importer::with_config(&db, &db, ImportConfig { dup_window_days });

    // A failed row never aborts the batch; only an unreadable file or a
    // bad header layout reaches this `?` and exits non-zero.
    let result = importer
        .import(file)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary_json(&result))?);
    } else {
        print_summary(&result);
    }

    Ok(())
}

fn print_summary(result: &ImportResult) {
    println!("✅ Import complete! ({} rows)", result.total_rows());
    println!("   Imported: {}", result.succeeded_count());
    println!("   Skipped (already imported): {}", result.skipped_count());

    if result.needs_attention_count() > 0 {
        println!("   ⚠️  Needs attention: {}", result.needs_attention_count());
        for flagged in &result.needs_attention {
            println!("      row {}: {}", flagged.row, flagged.reason);
        }
    }

    if result.failed_count() > 0 {
        println!("   ❌ Failed: {}", result.failed_count());
        for failed in &result.failed {
            println!("      row {}: {}", failed.row, failed.error);
        }
    }
}

/// JSON summary in the same shape the admin endpoint returns
fn summary_json(result: &ImportResult) -> serde_json::Value {
    serde_json::json!({
        "success_count": result.succeeded_count(),
        "skipped_count": result.skipped_count(),
        "failed_count": result.failed_count(),
        "needs_attention_count": result.needs_attention_count(),
        "errors": result.failed,
    })
}
