//! Donor management commands

use anyhow::Result;
use alms_core::db::Database;

use super::truncate;

pub fn cmd_donors_list(db: &Database, limit: i64) -> Result<()> {
    let donors = db.list_donors(limit, 0)?;

    if donors.is_empty() {
        println!("No donors yet. Run 'alms import --file payments.csv' first.");
        return Ok(());
    }

    println!(
        "{:>6}  {:<32}  {:<24}  {}",
        "ID", "EMAIL", "NAME", "STATE"
    );
    for donor in &donors {
        let state = if let Some(target) = donor.merged_into {
            format!("merged → {}", target)
        } else if donor.discarded_at.is_some() {
            "discarded".to_string()
        } else {
            String::new()
        };
        println!(
            "{:>6}  {:<32}  {:<24}  {}",
            donor.id,
            truncate(&donor.email, 32),
            truncate(donor.name.as_deref().unwrap_or("-"), 24),
            state
        );
    }

    Ok(())
}

pub fn cmd_donors_merge(db: &Database, source: i64, target: i64) -> Result<()> {
    let canonical = db.merge_donors(source, target)?;
    println!("✅ Merged donor {} into donor {}", source, canonical);
    println!("   Future imports for either email will resolve to donor {}.", canonical);
    Ok(())
}

pub fn cmd_donors_discard(db: &Database, id: i64) -> Result<()> {
    db.discard_donor(id)?;
    println!("✅ Donor {} discarded (record kept for history)", id);
    Ok(())
}
