//! Donation listing commands

use anyhow::Result;
use alms_core::db::Database;

use super::truncate;

pub fn cmd_donations_list(
    db: &Database,
    donor: Option<i64>,
    flagged: bool,
    limit: i64,
) -> Result<()> {
    let donations = if flagged {
        db.list_flagged_donations(limit, 0)?
    } else {
        db.list_donations(donor, limit, 0)?
    };

    if donations.is_empty() {
        if flagged {
            println!("Nothing awaiting review. 🎉");
        } else {
            println!("No donations yet. Run 'alms import --file payments.csv' first.");
        }
        return Ok(());
    }

    println!(
        "{:>6}  {:<10}  {:>10}  {:<15}  {:<24}  {}",
        "ID", "DATE", "AMOUNT", "STATUS", "CHARGE", "NOTE"
    );
    for donation in &donations {
        let amount = format!(
            "{}.{:02}",
            donation.amount_cents / 100,
            donation.amount_cents % 100
        );
        println!(
            "{:>6}  {:<10}  {:>10}  {:<15}  {:<24}  {}",
            donation.id,
            donation.date,
            amount,
            donation.status.as_str(),
            truncate(donation.charge_id.as_deref().unwrap_or("-"), 24),
            truncate(donation.attention_reason.as_deref().unwrap_or(""), 48),
        );
    }

    Ok(())
}
