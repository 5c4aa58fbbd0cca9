//! Payment-processor CSV batch importer
//!
//! Reads a Stripe-style payments export, and for each data row resolves
//! or creates a donor, upserts a donation keyed by the processor charge
//! id, and classifies the row into one of four buckets:
//!
//! - succeeded: a donation was created or updated
//! - skipped: the charge was already imported and nothing changed
//! - failed: the row could not be parsed or persisted (batch continues)
//! - needs_attention: imported, but flagged for human review because the
//!   donor appears to be billed twice under different subscriptions
//!
//! A malformed row never aborts the batch; only an unreadable file or an
//! unrecognized header layout does.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{Donation, DonationStatus, Donor, NewDonation, NewDonor};
use crate::store::{DonationStore, DonorStore};

/// Importer tuning knobs
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Grace window, in days, added to each side of a billing period when
    /// testing two subscriptions for overlap. The processor has been seen
    /// emitting duplicate subscription charges a few days apart, so plain
    /// interval intersection is too strict.
    pub dup_window_days: i64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { dup_window_days: 3 }
    }
}

/// A row that produced or matched a donation
#[derive(Debug, Clone, Serialize)]
pub struct RowRecord {
    /// 1-based position among the data rows of the file
    pub row: usize,
    pub charge_id: String,
    pub donation_id: i64,
}

/// A row that failed to parse or persist
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub row: usize,
    pub error: String,
}

/// A row imported but flagged for human review
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedRow {
    pub row: usize,
    pub charge_id: String,
    pub donation_id: i64,
    pub reason: String,
}

/// Aggregate outcome of one import run
///
/// Every data row lands in exactly one bucket, so the bucket sizes always
/// sum to the number of data rows processed.
#[derive(Debug, Default, Serialize)]
pub struct ImportResult {
    pub succeeded: Vec<RowRecord>,
    pub skipped: Vec<RowRecord>,
    pub failed: Vec<RowError>,
    pub needs_attention: Vec<FlaggedRow>,
}

impl ImportResult {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn needs_attention_count(&self) -> usize {
        self.needs_attention.len()
    }

    /// Total data rows processed
    pub fn total_rows(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len() + self.needs_attention.len()
    }
}

/// Column positions resolved from the export's header row
///
/// The export contract is a Stripe payments CSV: columns are matched by
/// name (case-insensitive, trimmed), extra columns are ignored, and the
/// required set is `id`, `Created (UTC)`, `Amount`, `Customer Email`.
/// A header row missing any required column aborts the import before any
/// row is processed.
#[derive(Debug, Clone)]
struct ColumnMap {
    charge_id: usize,
    created: usize,
    amount: usize,
    email: usize,
    status: Option<usize>,
    description: Option<usize>,
    donor_name: Option<usize>,
    customer_id: Option<usize>,
    invoice_id: Option<usize>,
    subscription_id: Option<usize>,
    period_start: Option<usize>,
    period_end: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| Error::Parse(format!("Missing required column: {}", name)))
        };

        Ok(Self {
            charge_id: require("id")?,
            created: require("Created (UTC)")?,
            amount: require("Amount")?,
            email: require("Customer Email")?,
            status: find("Status"),
            description: find("Description"),
            donor_name: find("Customer Description"),
            customer_id: find("Customer ID"),
            invoice_id: find("Invoice ID"),
            subscription_id: find("Subscription ID"),
            period_start: find("Period Start (UTC)"),
            period_end: find("Period End (UTC)"),
        })
    }
}

/// One validated data row, ready for donor and donation resolution
#[derive(Debug, Clone)]
struct ImportRow {
    charge_id: String,
    email: String,
    donor_name: Option<String>,
    amount_cents: i64,
    date: NaiveDate,
    status: DonationStatus,
    description: Option<String>,
    customer_id: Option<String>,
    invoice_id: Option<String>,
    subscription_id: Option<String>,
    period_start: Option<NaiveDate>,
    period_end: Option<NaiveDate>,
}

/// Batch importer over injected repository seams
pub struct Importer<'a> {
    donors: &'a dyn DonorStore,
    donations: &'a dyn DonationStore,
    config: ImportConfig,
}

/// Classification of a single successfully-processed row
enum RowOutcome {
    Imported { donation_id: i64 },
    Skipped { donation_id: i64 },
    Flagged { donation_id: i64, reason: String },
}

impl<'a> Importer<'a> {
    pub fn new(donors: &'a dyn DonorStore, donations: &'a dyn DonationStore) -> Self {
        Self::with_config(donors, donations, ImportConfig::default())
    }

    pub fn with_config(
        donors: &'a dyn DonorStore,
        donations: &'a dyn DonationStore,
        config: ImportConfig,
    ) -> Self {
        Self {
            donors,
            donations,
            config,
        }
    }

    /// Import a CSV file from disk
    ///
    /// An unreadable file or unrecognized header layout is fatal and
    /// returns an error; anything wrong with an individual row lands in
    /// the result's failed bucket instead.
    pub fn import(&self, path: &Path) -> Result<ImportResult> {
        let file = File::open(path)?;
        self.import_reader(file)
    }

    /// Import CSV data from any reader
    pub fn import_reader<R: Read>(&self, reader: R) -> Result<ImportResult> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let columns = ColumnMap::from_headers(&headers)?;

        let mut result = ImportResult::default();

        for (i, record) in rdr.records().enumerate() {
            let row = i + 1;

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.failed.push(RowError {
                        row,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            match self.process_row(&columns, &record) {
                Ok((charge_id, RowOutcome::Imported { donation_id })) => {
                    result.succeeded.push(RowRecord {
                        row,
                        charge_id,
                        donation_id,
                    });
                }
                Ok((charge_id, RowOutcome::Skipped { donation_id })) => {
                    result.skipped.push(RowRecord {
                        row,
                        charge_id,
                        donation_id,
                    });
                }
                Ok((charge_id, RowOutcome::Flagged { donation_id, reason })) => {
                    warn!(row, charge_id = %charge_id, %reason, "Donation flagged for review");
                    result.needs_attention.push(FlaggedRow {
                        row,
                        charge_id,
                        donation_id,
                        reason,
                    });
                }
                Err(e) => {
                    result.failed.push(RowError {
                        row,
                        error: e.to_string(),
                    });
                }
            }
        }

        debug!(
            succeeded = result.succeeded_count(),
            skipped = result.skipped_count(),
            failed = result.failed_count(),
            needs_attention = result.needs_attention_count(),
            "Import run complete"
        );

        Ok(result)
    }

    /// Parse, resolve and persist a single row
    fn process_row(
        &self,
        columns: &ColumnMap,
        record: &StringRecord,
    ) -> Result<(String, RowOutcome)> {
        let row = parse_row(columns, record)?;
        let donor = self.resolve_donor(&row)?;
        let outcome = self.upsert_donation(&donor, &row)?;
        Ok((row.charge_id, outcome))
    }

    /// Find the donor for a row, creating one on first sighting
    ///
    /// A match whose merge pointer is set resolves to the canonical donor
    /// in a single hop; chains are flattened at merge time so no loop is
    /// needed. Existing donors get their blank contact fields filled in
    /// ("fill missing, never clobber present") and their updated
    /// timestamp bumped.
    fn resolve_donor(&self, row: &ImportRow) -> Result<Donor> {
        let found = self.donors.find_donor_by_email(&row.email)?;

        let donor = match found {
            Some(donor) => {
                let canonical = match donor.merged_into {
                    Some(target_id) => self.donors.get_donor(target_id)?.ok_or_else(|| {
                        Error::InvalidData(format!(
                            "Donor {} merged into missing donor {}",
                            donor.id, target_id
                        ))
                    })?,
                    None => donor,
                };

                // Fill a blank name from the row, never overwrite one
                let new_name = match (&canonical.name, &row.donor_name) {
                    (None, Some(name)) => Some(name.as_str()),
                    (Some(existing), Some(name)) if existing.trim().is_empty() => {
                        Some(name.as_str())
                    }
                    _ => None,
                };
                self.donors.update_donor_contact(canonical.id, new_name)?;

                canonical
            }
            None => self.donors.create_donor(&NewDonor {
                email: row.email.clone(),
                name: row.donor_name.clone(),
            })?,
        };

        Ok(donor)
    }

    /// Upsert the row's donation and classify the outcome
    fn upsert_donation(&self, donor: &Donor, row: &ImportRow) -> Result<RowOutcome> {
        if let Some(existing) = self.donations.find_donation_by_charge_id(&row.charge_id)? {
            // Re-import of a known charge: no-op when nothing changed,
            // otherwise update in place. Amounts are stored in minor
            // units, so the comparison is exact. A stored
            // needs_attention status belongs to the earlier run's
            // classification; an identical active row skips rather than
            // reclassifying it, and only a human clears the flag.
            let unchanged =
                existing.amount_cents == row.amount_cents && existing.date == row.date;
            let still_flagged =
                existing.status == DonationStatus::NeedsAttention && row.status.is_active();

            if unchanged && (existing.status == row.status || still_flagged) {
                return Ok(RowOutcome::Skipped {
                    donation_id: existing.id,
                });
            }

            // Updates carry the review flag through
            let mut updated = row.to_new_donation(donor.id, existing.attention_reason.clone());
            if still_flagged {
                updated.status = DonationStatus::NeedsAttention;
            }
            self.donations.update_donation(existing.id, &updated)?;
            return Ok(RowOutcome::Imported {
                donation_id: existing.id,
            });
        }

        // New charge: check for a second active subscription billing the
        // same donor over an overlapping period before creating. The row
        // is still imported, just flagged so a human can reconcile
        // possible double-billing.
        let reason = self.duplicate_subscription_reason(donor, row)?;

        match reason {
            Some(reason) => {
                let mut donation = row.to_new_donation(donor.id, Some(reason.clone()));
                donation.status = DonationStatus::NeedsAttention;
                let donation_id = self.donations.create_donation(&donation)?;
                Ok(RowOutcome::Flagged {
                    donation_id,
                    reason,
                })
            }
            None => {
                let donation_id = self
                    .donations
                    .create_donation(&row.to_new_donation(donor.id, None))?;
                Ok(RowOutcome::Imported { donation_id })
            }
        }
    }

    /// Detect a duplicate active subscription for this donor
    ///
    /// Fires when the donor already holds an active donation tied to a
    /// *different* subscription id whose billing period overlaps the
    /// row's, after widening the row's period by the configured grace
    /// window. Rows without a subscription id never trigger it.
    fn duplicate_subscription_reason(
        &self,
        donor: &Donor,
        row: &ImportRow,
    ) -> Result<Option<String>> {
        let Some(subscription_id) = &row.subscription_id else {
            return Ok(None);
        };

        let grace = chrono::Duration::days(self.config.dup_window_days);
        let row_start = row.period_start.unwrap_or(row.date) - grace;
        let row_end = row.period_end.unwrap_or(row.date) + grace;

        let active = self.donations.list_active_subscription_donations(donor.id)?;
        for other in &active {
            let other_sub = other.subscription_id.as_deref().unwrap_or("");
            if other_sub == subscription_id {
                continue;
            }
            if periods_overlap(row_start, row_end, other) {
                return Ok(Some(format!(
                    "Donor already has active subscription {} with overlapping period (donation {}, charge {}); possible double-billing against subscription {}",
                    other_sub,
                    other.id,
                    other.charge_id.as_deref().unwrap_or("unknown"),
                    subscription_id,
                )));
            }
        }

        Ok(None)
    }
}

/// Test whether an existing donation's period intersects [start, end]
///
/// A donation without period columns is treated as covering only its
/// charge date.
fn periods_overlap(start: NaiveDate, end: NaiveDate, other: &Donation) -> bool {
    let other_start = other.period_start.unwrap_or(other.date);
    let other_end = other.period_end.unwrap_or(other.date);
    start <= other_end && other_start <= end
}

/// Validate one CSV record into a normalized row
fn parse_row(columns: &ColumnMap, record: &StringRecord) -> Result<ImportRow> {
    let required = |idx: usize, name: &str| -> Result<&str> {
        record
            .get(idx)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Parse(format!("Missing {}", name)))
    };
    let optional = |idx: Option<usize>| -> Option<String> {
        idx.and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let charge_id = required(columns.charge_id, "charge id")?.to_string();
    let email = required(columns.email, "customer email")?.to_lowercase();
    let date = parse_date(required(columns.created, "created date")?)?;
    let amount_cents = parse_amount_cents(required(columns.amount, "amount")?)?;

    let status = match optional(columns.status) {
        Some(s) => s.parse::<DonationStatus>().map_err(Error::Parse)?,
        None => DonationStatus::Succeeded,
    };

    let period_start = optional(columns.period_start)
        .map(|s| parse_date(&s))
        .transpose()?;
    let period_end = optional(columns.period_end)
        .map(|s| parse_date(&s))
        .transpose()?;

    Ok(ImportRow {
        charge_id,
        email,
        donor_name: optional(columns.donor_name),
        amount_cents,
        date,
        status,
        description: optional(columns.description),
        customer_id: optional(columns.customer_id),
        invoice_id: optional(columns.invoice_id),
        subscription_id: optional(columns.subscription_id),
        period_start,
        period_end,
    })
}

impl ImportRow {
    fn to_new_donation(&self, donor_id: i64, attention_reason: Option<String>) -> NewDonation {
        NewDonation {
            donor_id,
            amount_cents: self.amount_cents,
            date: self.date,
            status: self.status,
            description: self.description.clone(),
            charge_id: Some(self.charge_id.clone()),
            subscription_id: self.subscription_id.clone(),
            customer_id: self.customer_id.clone(),
            invoice_id: self.invoice_id.clone(),
            period_start: self.period_start,
            period_end: self.period_end,
            attention_reason,
        }
    }
}

/// Parse a date or timestamp string in the formats the processor emits
fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S", // 2024-01-15 10:23:45
        "%Y-%m-%d %H:%M",    // 2024-01-15 10:23
    ];
    for fmt in datetime_formats {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    let date_formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
    ];
    for fmt in date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::Parse(format!("Unable to parse date: {}", s)))
}

/// Parse a decimal amount string into non-negative minor units (cents)
///
/// Handles currency symbols, thousands separators, and sub-cent decimals
/// (the third decimal digit rounds half-up; amounts are non-negative so
/// half-up and half-away coincide). Parsed digit-wise rather than
/// through f64, whose binary representation misrounds values like
/// "0.615". Negative amounts are rejected; refunds arrive as separate
/// rows with a refunded status, not negative charges.
fn parse_amount_cents(s: &str) -> Result<i64> {
    let cleaned: String = s.trim().replace(['$', ',', ' '], "");
    let negative = cleaned.starts_with('-');
    let unsigned = cleaned.trim_start_matches('-');

    let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
        return Err(Error::Parse(format!("Unable to parse amount: {}", s)));
    }
    if negative {
        return Err(Error::Parse(format!("Negative amount: {}", s)));
    }

    let whole: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| Error::Parse(format!("Amount out of range: {}", s)))?
    };

    let mut digits = frac.bytes().map(|b| i64::from(b - b'0'));
    let mut frac_cents = digits.next().unwrap_or(0) * 10 + digits.next().unwrap_or(0);
    if digits.next().is_some_and(|d| d >= 5) {
        frac_cents += 1;
    }

    whole
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(frac_cents))
        .ok_or_else(|| Error::Parse(format!("Amount out of range: {}", s)))
}
