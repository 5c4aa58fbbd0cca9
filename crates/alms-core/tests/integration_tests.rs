//! Integration tests for alms-core
//!
//! These tests exercise the full CSV import → donor resolution →
//! donation upsert → classification workflow against a real database.

use alms_core::{
    db::Database,
    import::{ImportConfig, Importer},
    models::{DonationStatus, NewDonor},
    store::{DonationStore, DonorStore},
};

const HEADER: &str = "id,Created (UTC),Amount,Currency,Status,Description,Customer ID,Customer Email,Customer Description,Invoice ID,Subscription ID,Period Start (UTC),Period End (UTC)";

/// Helper to build a payments export from data rows
fn export(rows: &[&str]) -> String {
    let mut csv = String::from(HEADER);
    for row in rows {
        csv.push('\n');
        csv.push_str(row);
    }
    csv
}

#[test]
fn test_fresh_import_lands_in_succeeded() {
    let db = Database::in_memory().unwrap();
    let importer = Importer::new(&db, &db);

    let csv = export(&[
        "ch_1,2024-01-15 08:00:00,25.00,usd,Paid,January gift,cus_1,jane@example.com,Jane Doe,,,,",
        "ch_2,2024-01-16 09:30:00,50.00,usd,Paid,,cus_2,john@example.com,John Smith,,,,",
    ]);

    let result = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(result.succeeded_count(), 2);
    assert_eq!(result.total_rows(), 2);
    assert_eq!(result.failed_count(), 0);

    // Exactly one new donation per unseen charge id
    let jane = db.find_donor_by_email("jane@example.com").unwrap().unwrap();
    assert_eq!(jane.name.as_deref(), Some("Jane Doe"));
    let donation = db.find_donation_by_charge_id("ch_1").unwrap().unwrap();
    assert_eq!(donation.donor_id, jane.id);
    assert_eq!(donation.amount_cents, 2500);
    assert_eq!(donation.status, DonationStatus::Succeeded);
    assert_eq!(db.count_donations().unwrap(), 2);
}

#[test]
fn test_reimport_is_idempotent() {
    let db = Database::in_memory().unwrap();
    let importer = Importer::new(&db, &db);

    let csv = export(&[
        "ch_1,2024-01-15,25.00,usd,Paid,,cus_1,jane@example.com,Jane Doe,,,,",
        "ch_2,2024-01-16,50.00,usd,Paid,,cus_2,john@example.com,John Smith,,,,",
    ]);

    let first = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(first.succeeded_count(), 2);

    let second = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(second.succeeded_count(), 0);
    assert_eq!(second.skipped_count(), first.succeeded_count());
    assert_eq!(db.count_donations().unwrap(), 2);
}

#[test]
fn test_reimport_with_changed_amount_updates_in_place() {
    let db = Database::in_memory().unwrap();
    let importer = Importer::new(&db, &db);

    let csv = export(&["ch_1,2024-01-15,25.00,usd,Paid,,cus_1,jane@example.com,,,,,"]);
    importer.import_reader(csv.as_bytes()).unwrap();

    // Same charge, refunded with a corrected amount
    let csv = export(&["ch_1,2024-01-15,20.00,usd,Refunded,,cus_1,jane@example.com,,,,,"]);
    let result = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(result.succeeded_count(), 1);
    assert_eq!(result.skipped_count(), 0);

    let donation = db.find_donation_by_charge_id("ch_1").unwrap().unwrap();
    assert_eq!(donation.amount_cents, 2000);
    assert_eq!(donation.status, DonationStatus::Refunded);
    assert_eq!(db.count_donations().unwrap(), 1);
}

#[test]
fn test_merged_donor_resolves_to_canonical() {
    let db = Database::in_memory().unwrap();

    let stale = db
        .create_donor(&NewDonor {
            email: "jane@example.com".into(),
            name: None,
        })
        .unwrap();
    let canonical = db
        .create_donor(&NewDonor {
            email: "jane.doe@example.com".into(),
            name: Some("Jane Doe".into()),
        })
        .unwrap();
    db.merge_donors(stale.id, canonical.id).unwrap();

    let importer = Importer::new(&db, &db);
    let csv = export(&["ch_1,2024-01-15,25.00,usd,Paid,,cus_1,jane@example.com,,,,,"]);
    let result = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(result.succeeded_count(), 1);

    let donation = db.find_donation_by_charge_id("ch_1").unwrap().unwrap();
    assert_eq!(donation.donor_id, canonical.id, "must attach to the canonical donor");
}

#[test]
fn test_bad_amount_fails_row_without_side_effects() {
    let db = Database::in_memory().unwrap();
    let importer = Importer::new(&db, &db);

    let csv = export(&[
        "ch_1,2024-01-15,25.00,usd,Paid,,cus_1,jane@example.com,,,,,",
        "ch_2,2024-01-16,abc,usd,Paid,,cus_2,john@example.com,,,,,",
        "ch_3,2024-01-17,10.00,usd,Paid,,cus_3,mary@example.com,,,,,",
    ]);

    let result = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(result.succeeded_count(), 2);
    assert_eq!(result.failed_count(), 1);
    // 1-based data row position
    assert_eq!(result.failed[0].row, 2);
    assert!(result.failed[0].error.contains("abc"));

    // The bad row created neither a donor nor a donation
    assert!(db.find_donor_by_email("john@example.com").unwrap().is_none());
    assert!(db.find_donation_by_charge_id("ch_2").unwrap().is_none());
    assert_eq!(result.total_rows(), 3);
}

#[test]
fn test_duplicate_subscription_flags_second_row() {
    let db = Database::in_memory().unwrap();
    let importer = Importer::new(&db, &db);

    // Same donor, overlapping monthly periods, different subscription ids
    let csv = export(&[
        "ch_1,2024-01-01,25.00,usd,Paid,,cus_1,jane@example.com,,in_1,sub_a,2024-01-01,2024-01-31",
        "ch_2,2024-01-05,25.00,usd,Paid,,cus_1,jane@example.com,,in_2,sub_b,2024-01-05,2024-02-04",
    ]);

    let result = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(result.succeeded_count(), 1);
    assert_eq!(result.needs_attention_count(), 1);

    let flagged = &result.needs_attention[0];
    assert_eq!(flagged.row, 2);
    assert!(!flagged.reason.is_empty());
    assert!(flagged.reason.contains("sub_a"));

    // Both donations exist; the second carries the flag
    assert!(db.find_donation_by_charge_id("ch_1").unwrap().is_some());
    let second = db.find_donation_by_charge_id("ch_2").unwrap().unwrap();
    assert_eq!(second.status, DonationStatus::NeedsAttention);
    assert!(second.attention_reason.is_some());
    assert_eq!(db.count_flagged_donations().unwrap(), 1);
}

#[test]
fn test_reimport_keeps_attention_flag() {
    let db = Database::in_memory().unwrap();
    let importer = Importer::new(&db, &db);

    let csv = export(&[
        "ch_1,2024-01-01,25.00,usd,Paid,,cus_1,jane@example.com,,in_1,sub_a,2024-01-01,2024-01-31",
        "ch_2,2024-01-05,25.00,usd,Paid,,cus_1,jane@example.com,,in_2,sub_b,2024-01-05,2024-02-04",
    ]);

    let first = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(first.needs_attention_count(), 1);

    // Re-running the identical file is a pure no-op: the flagged row
    // skips like any other, and the review queue is untouched
    let second = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(second.succeeded_count(), 0);
    assert_eq!(second.skipped_count(), 2);
    assert_eq!(db.count_flagged_donations().unwrap(), 1);

    let flagged = db.find_donation_by_charge_id("ch_2").unwrap().unwrap();
    assert_eq!(flagged.status, DonationStatus::NeedsAttention);
    assert!(flagged.attention_reason.is_some());

    // A corrected amount updates the record but keeps the flag
    let csv = export(&[
        "ch_2,2024-01-05,30.00,usd,Paid,,cus_1,jane@example.com,,in_2,sub_b,2024-01-05,2024-02-04",
    ]);
    let third = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(third.succeeded_count(), 1);

    let flagged = db.find_donation_by_charge_id("ch_2").unwrap().unwrap();
    assert_eq!(flagged.amount_cents, 3000);
    assert_eq!(flagged.status, DonationStatus::NeedsAttention);
    assert!(flagged.attention_reason.is_some());
    assert_eq!(db.count_flagged_donations().unwrap(), 1);
}

#[test]
fn test_same_subscription_renewal_not_flagged() {
    let db = Database::in_memory().unwrap();
    let importer = Importer::new(&db, &db);

    let csv = export(&[
        "ch_1,2024-01-01,25.00,usd,Paid,,cus_1,jane@example.com,,in_1,sub_a,2024-01-01,2024-01-31",
        "ch_2,2024-02-01,25.00,usd,Paid,,cus_1,jane@example.com,,in_2,sub_a,2024-02-01,2024-02-29",
    ]);

    let result = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(result.succeeded_count(), 2);
    assert_eq!(result.needs_attention_count(), 0);
}

#[test]
fn test_canceled_subscription_does_not_trigger_flag() {
    let db = Database::in_memory().unwrap();
    let importer = Importer::new(&db, &db);

    // A canceled subscription charge is settled history, so a new
    // subscription in the same period is a resubscribe, not a duplicate.
    let csv = export(&[
        "ch_1,2024-01-01,25.00,usd,Canceled,,cus_1,jane@example.com,,in_1,sub_a,2024-01-01,2024-01-31",
        "ch_2,2024-01-10,25.00,usd,Paid,,cus_1,jane@example.com,,in_2,sub_b,2024-01-10,2024-02-09",
    ]);

    let result = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(result.succeeded_count(), 2);
    assert_eq!(result.needs_attention_count(), 0);
}

#[test]
fn test_grace_window_is_configurable() {
    let db = Database::in_memory().unwrap();

    // Periods 2 days apart: caught with the default window, not with 0
    let csv = export(&[
        "ch_1,2024-01-01,25.00,usd,Paid,,cus_1,jane@example.com,,in_1,sub_a,2024-01-01,2024-01-31",
        "ch_2,2024-02-02,25.00,usd,Paid,,cus_1,jane@example.com,,in_2,sub_b,2024-02-02,2024-03-03",
    ]);

    let strict = Importer::with_config(&db, &db, ImportConfig { dup_window_days: 0 });
    let result = strict.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(result.needs_attention_count(), 0);

    let db = Database::in_memory().unwrap();
    let lenient = Importer::with_config(&db, &db, ImportConfig { dup_window_days: 3 });
    let result = lenient.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(result.needs_attention_count(), 1);
}

#[test]
fn test_counts_always_sum_to_data_rows() {
    let db = Database::in_memory().unwrap();
    let importer = Importer::new(&db, &db);

    let csv = export(&[
        "ch_1,2024-01-15,25.00,usd,Paid,,cus_1,jane@example.com,,,,,",
        "ch_2,2024-01-16,abc,usd,Paid,,cus_2,john@example.com,,,,,",
        "ch_1,2024-01-15,25.00,usd,Paid,,cus_1,jane@example.com,,,,,",
        "ch_3,bogus-date,10.00,usd,Paid,,cus_3,mary@example.com,,,,,",
        ",2024-01-18,10.00,usd,Paid,,cus_4,paul@example.com,,,,,",
    ]);

    let result = importer.import_reader(csv.as_bytes()).unwrap();
    assert_eq!(
        result.succeeded_count()
            + result.skipped_count()
            + result.failed_count()
            + result.needs_attention_count(),
        5
    );
    assert_eq!(result.succeeded_count(), 1);
    assert_eq!(result.skipped_count(), 1);
    assert_eq!(result.failed_count(), 3);
}

#[test]
fn test_missing_required_header_is_fatal() {
    let db = Database::in_memory().unwrap();
    let importer = Importer::new(&db, &db);

    let csv = "id,Created (UTC),Amount\nch_1,2024-01-15,25.00";
    let err = importer.import_reader(csv.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("Customer Email"));
    assert_eq!(db.count_donations().unwrap(), 0);
}

#[test]
fn test_fill_missing_never_clobber_present() {
    let db = Database::in_memory().unwrap();
    let importer = Importer::new(&db, &db);

    // First sighting has no name
    let csv = export(&["ch_1,2024-01-15,25.00,usd,Paid,,cus_1,jane@example.com,,,,,"]);
    importer.import_reader(csv.as_bytes()).unwrap();
    let donor = db.find_donor_by_email("jane@example.com").unwrap().unwrap();
    assert!(donor.name.is_none());

    // Later row supplies a name: filled in
    let csv = export(&["ch_2,2024-02-15,25.00,usd,Paid,,cus_1,jane@example.com,Jane Doe,,,,"]);
    importer.import_reader(csv.as_bytes()).unwrap();
    let donor = db.find_donor_by_email("jane@example.com").unwrap().unwrap();
    assert_eq!(donor.name.as_deref(), Some("Jane Doe"));

    // A different name later never overwrites the stored one
    let csv = export(&["ch_3,2024-03-15,25.00,usd,Paid,,cus_1,jane@example.com,J. Doe,,,,"]);
    importer.import_reader(csv.as_bytes()).unwrap();
    let donor = db.find_donor_by_email("jane@example.com").unwrap().unwrap();
    assert_eq!(donor.name.as_deref(), Some("Jane Doe"));
}
