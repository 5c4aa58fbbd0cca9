//! Domain models for Alms

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A giving entity, identified by email
///
/// Donors are never hard-deleted. `discarded_at` marks a donor inactive,
/// and `merged_into` points at the canonical donor after a merge. Merge
/// chains are flattened at merge time, so the pointer is always at most
/// one hop from a canonical donor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donor {
    pub id: i64,
    /// Case-normalized (lowercase, trimmed) email address
    pub email: String,
    pub name: Option<String>,
    /// Canonical donor this record was merged into, if any
    pub merged_into: Option<i64>,
    /// Soft-discard marker; the record stays behind for history
    pub discarded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Donor {
    /// Whether this donor has been merged away into another record
    pub fn is_merged(&self) -> bool {
        self.merged_into.is_some()
    }
}

/// A new donor, created on first sighting of an email
#[derive(Debug, Clone)]
pub struct NewDonor {
    pub email: String,
    pub name: Option<String>,
}

/// Donation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Succeeded,
    Failed,
    Refunded,
    Canceled,
    NeedsAttention,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Canceled => "canceled",
            Self::NeedsAttention => "needs_attention",
        }
    }

    /// Whether a donation in this status still represents live billing
    ///
    /// Only active donations participate in duplicate-subscription
    /// detection; a refunded or canceled charge is settled history.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Succeeded | Self::NeedsAttention)
    }
}

impl std::str::FromStr for DonationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "succeeded" | "paid" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            "needs_attention" => Ok(Self::NeedsAttention),
            _ => Err(format!("Unknown donation status: {}", s)),
        }
    }
}

impl std::fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One financial transaction attributed to a donor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: i64,
    pub donor_id: i64,
    /// Amount in currency minor units (cents); always non-negative
    pub amount_cents: i64,
    pub date: NaiveDate,
    pub status: DonationStatus,
    pub description: Option<String>,
    /// Processor charge id, the idempotency key for re-imports
    pub charge_id: Option<String>,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
    pub invoice_id: Option<String>,
    /// Billing period covered by a subscription charge
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    /// Why this donation was flagged for human review, if it was
    pub attention_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A donation parsed from an import row, not yet persisted
#[derive(Debug, Clone)]
pub struct NewDonation {
    pub donor_id: i64,
    pub amount_cents: i64,
    pub date: NaiveDate,
    pub status: DonationStatus,
    pub description: Option<String>,
    pub charge_id: Option<String>,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
    pub invoice_id: Option<String>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub attention_reason: Option<String>,
}
