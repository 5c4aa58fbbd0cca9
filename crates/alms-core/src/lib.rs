//! Alms Core Library
//!
//! Shared functionality for the Alms donation back office:
//! - Database access and migrations
//! - Payment-processor CSV batch importer
//! - Donor resolution with merge-pointer handling
//! - Idempotent donation upsert keyed by processor charge id
//! - Duplicate-subscription detection for human review

pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod store;

pub use db::Database;
pub use error::{Error, Result};
pub use import::{ImportConfig, ImportResult, Importer, RowError};
pub use models::{Donation, DonationStatus, Donor, NewDonation, NewDonor};
pub use store::{DonationStore, DonorStore};
