//! Donor operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Donor, NewDonor};
use crate::store::DonorStore;

fn row_to_donor(row: &Row<'_>) -> rusqlite::Result<Donor> {
    let discarded_at: Option<String> = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;

    Ok(Donor {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        merged_into: row.get(3)?,
        discarded_at: discarded_at.map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

const DONOR_COLUMNS: &str = "id, email, name, merged_into, discarded_at, created_at, updated_at";

impl DonorStore for Database {
    fn find_donor_by_email(&self, email: &str) -> Result<Option<Donor>> {
        let conn = self.conn()?;
        let donor = conn
            .query_row(
                &format!(
                    "SELECT {} FROM donors WHERE email = ? COLLATE NOCASE",
                    DONOR_COLUMNS
                ),
                params![email.trim().to_lowercase()],
                row_to_donor,
            )
            .optional()?;
        Ok(donor)
    }

    fn get_donor(&self, id: i64) -> Result<Option<Donor>> {
        let conn = self.conn()?;
        let donor = conn
            .query_row(
                &format!("SELECT {} FROM donors WHERE id = ?", DONOR_COLUMNS),
                params![id],
                row_to_donor,
            )
            .optional()?;
        Ok(donor)
    }

    fn create_donor(&self, donor: &NewDonor) -> Result<Donor> {
        let conn = self.conn()?;
        let email = donor.email.trim().to_lowercase();
        conn.execute(
            "INSERT INTO donors (email, name) VALUES (?, ?)",
            params![email, donor.name],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_donor(id)?
            .ok_or_else(|| Error::NotFound(format!("Donor {} vanished after insert", id)))
    }

    fn update_donor_contact(&self, id: i64, name: Option<&str>) -> Result<()> {
        let conn = self.conn()?;
        match name {
            Some(name) => conn.execute(
                "UPDATE donors SET name = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                params![name, id],
            )?,
            None => conn.execute(
                "UPDATE donors SET updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                params![id],
            )?,
        };
        Ok(())
    }
}

impl Database {
    /// Merge one donor into another
    ///
    /// All of the source's donations move to the target, every donor
    /// currently merged into the source is re-pointed at the target
    /// (single-hop flattening), and the source's merge pointer is set.
    /// If the target has itself been merged, its canonical donor is
    /// used instead, so pointers never chain.
    pub fn merge_donors(&self, source_id: i64, target_id: i64) -> Result<i64> {
        let source = self
            .get_donor(source_id)?
            .ok_or_else(|| Error::NotFound(format!("Donor {} not found", source_id)))?;
        let target = self
            .get_donor(target_id)?
            .ok_or_else(|| Error::NotFound(format!("Donor {} not found", target_id)))?;

        // Flatten through the target's own pointer, if set
        let canonical_id = target.merged_into.unwrap_or(target.id);
        if canonical_id == source.id {
            return Err(Error::InvalidData(format!(
                "Cannot merge donor {} into itself",
                source_id
            )));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE donations SET donor_id = ? WHERE donor_id = ?",
            params![canonical_id, source.id],
        )?;
        tx.execute(
            "UPDATE donors SET merged_into = ? WHERE merged_into = ?",
            params![canonical_id, source.id],
        )?;
        tx.execute(
            "UPDATE donors SET merged_into = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![canonical_id, source.id],
        )?;

        tx.commit()?;

        tracing::info!(
            source = source.id,
            target = canonical_id,
            "Merged donor into canonical record"
        );
        Ok(canonical_id)
    }

    /// Soft-discard a donor (records are never hard-deleted)
    pub fn discard_donor(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE donors SET discarded_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ? AND discarded_at IS NULL",
            params![id],
        )?;
        if changed == 0 {
            // Either missing or already discarded; distinguish for the caller
            if self.get_donor(id)?.is_none() {
                return Err(Error::NotFound(format!("Donor {} not found", id)));
            }
        }
        Ok(())
    }

    /// List donors, newest first
    pub fn list_donors(&self, limit: i64, offset: i64) -> Result<Vec<Donor>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM donors ORDER BY id DESC LIMIT ? OFFSET ?",
            DONOR_COLUMNS
        ))?;

        let donors = stmt
            .query_map(params![limit, offset], row_to_donor)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(donors)
    }

    /// Count all donors (merged and discarded included)
    pub fn count_donors(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM donors", [], |row| row.get(0))?;
        Ok(count)
    }
}
