//! Repository seams for donor and donation persistence
//!
//! The importer is written against these traits rather than the SQLite
//! `Database` directly, so the persistence layer can be swapped out and
//! the pipeline tested against lightweight fakes. `Database` implements
//! both traits (see `db::donors` and `db::donations`).

use crate::error::Result;
use crate::models::{Donation, Donor, NewDonation, NewDonor};

/// Donor persistence operations needed by the importer
pub trait DonorStore {
    /// Find a donor by case-insensitive exact email match
    ///
    /// Returns the matching record as stored; callers are responsible
    /// for following a set merge pointer to the canonical donor.
    fn find_donor_by_email(&self, email: &str) -> Result<Option<Donor>>;

    /// Fetch a donor by id
    fn get_donor(&self, id: i64) -> Result<Option<Donor>>;

    /// Create a donor, returning the stored record
    fn create_donor(&self, donor: &NewDonor) -> Result<Donor>;

    /// Update a donor's contact fields and bump its updated timestamp
    ///
    /// A `None` name leaves the stored name untouched.
    fn update_donor_contact(&self, id: i64, name: Option<&str>) -> Result<()>;
}

/// Donation persistence operations needed by the importer
pub trait DonationStore {
    /// Find a donation by its processor charge id
    fn find_donation_by_charge_id(&self, charge_id: &str) -> Result<Option<Donation>>;

    /// Insert a donation, returning its new id
    fn create_donation(&self, donation: &NewDonation) -> Result<i64>;

    /// Overwrite an existing donation's imported fields
    fn update_donation(&self, id: i64, donation: &NewDonation) -> Result<()>;

    /// List a donor's active donations that are tied to a subscription
    ///
    /// Used by duplicate-subscription detection. Only donations with a
    /// subscription id and an active status are returned.
    fn list_active_subscription_donations(&self, donor_id: i64) -> Result<Vec<Donation>>;
}
