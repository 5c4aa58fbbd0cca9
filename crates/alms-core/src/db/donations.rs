//! Donation operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Donation, DonationStatus, NewDonation};
use crate::store::DonationStore;

const DONATION_COLUMNS: &str = "id, donor_id, amount_cents, date, status, description, charge_id, \
     subscription_id, customer_id, invoice_id, period_start, period_end, attention_reason, created_at";

fn parse_date_col(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

fn row_to_donation(row: &Row<'_>) -> rusqlite::Result<Donation> {
    let date: String = row.get(3)?;
    let status: String = row.get(4)?;
    let period_start: Option<String> = row.get(10)?;
    let period_end: Option<String> = row.get(11)?;
    let created_at: String = row.get(13)?;

    Ok(Donation {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        amount_cents: row.get(2)?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
        status: status.parse().unwrap_or(DonationStatus::NeedsAttention),
        description: row.get(5)?,
        charge_id: row.get(6)?,
        subscription_id: row.get(7)?,
        customer_id: row.get(8)?,
        invoice_id: row.get(9)?,
        period_start: parse_date_col(period_start),
        period_end: parse_date_col(period_end),
        attention_reason: row.get(12)?,
        created_at: parse_datetime(&created_at),
    })
}

impl DonationStore for Database {
    fn find_donation_by_charge_id(&self, charge_id: &str) -> Result<Option<Donation>> {
        let conn = self.conn()?;
        let donation = conn
            .query_row(
                &format!(
                    "SELECT {} FROM donations WHERE charge_id = ?",
                    DONATION_COLUMNS
                ),
                params![charge_id],
                row_to_donation,
            )
            .optional()?;
        Ok(donation)
    }

    fn create_donation(&self, donation: &NewDonation) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO donations (donor_id, amount_cents, date, status, description, charge_id,
                                   subscription_id, customer_id, invoice_id, period_start, period_end,
                                   attention_reason)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                donation.donor_id,
                donation.amount_cents,
                donation.date.to_string(),
                donation.status.as_str(),
                donation.description,
                donation.charge_id,
                donation.subscription_id,
                donation.customer_id,
                donation.invoice_id,
                donation.period_start.map(|d| d.to_string()),
                donation.period_end.map(|d| d.to_string()),
                donation.attention_reason,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn update_donation(&self, id: i64, donation: &NewDonation) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE donations SET donor_id = ?, amount_cents = ?, date = ?, status = ?,
                                 description = ?, subscription_id = ?, customer_id = ?,
                                 invoice_id = ?, period_start = ?, period_end = ?,
                                 attention_reason = ?
            WHERE id = ?
            "#,
            params![
                donation.donor_id,
                donation.amount_cents,
                donation.date.to_string(),
                donation.status.as_str(),
                donation.description,
                donation.subscription_id,
                donation.customer_id,
                donation.invoice_id,
                donation.period_start.map(|d| d.to_string()),
                donation.period_end.map(|d| d.to_string()),
                donation.attention_reason,
                id,
            ],
        )?;
        Ok(())
    }

    fn list_active_subscription_donations(&self, donor_id: i64) -> Result<Vec<Donation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM donations \
             WHERE donor_id = ? AND subscription_id IS NOT NULL \
               AND status IN ('succeeded', 'needs_attention') \
             ORDER BY date ASC, id ASC",
            DONATION_COLUMNS
        ))?;

        let donations = stmt
            .query_map(params![donor_id], row_to_donation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(donations)
    }
}

impl Database {
    /// List donations, newest first, optionally scoped to one donor
    pub fn list_donations(
        &self,
        donor_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Donation>> {
        let conn = self.conn()?;

        if let Some(donor_id) = donor_id {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM donations WHERE donor_id = ? \
                 ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
                DONATION_COLUMNS
            ))?;
            let donations = stmt
                .query_map(params![donor_id, limit, offset], row_to_donation)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(donations)
        } else {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM donations ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
                DONATION_COLUMNS
            ))?;
            let donations = stmt
                .query_map(params![limit, offset], row_to_donation)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(donations)
        }
    }

    /// List donations flagged for human review, oldest first
    pub fn list_flagged_donations(&self, limit: i64, offset: i64) -> Result<Vec<Donation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM donations WHERE attention_reason IS NOT NULL \
             ORDER BY date ASC, id ASC LIMIT ? OFFSET ?",
            DONATION_COLUMNS
        ))?;

        let donations = stmt
            .query_map(params![limit, offset], row_to_donation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(donations)
    }

    /// Count all donations
    pub fn count_donations(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM donations", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count donations awaiting human review
    pub fn count_flagged_donations(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM donations WHERE attention_reason IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
