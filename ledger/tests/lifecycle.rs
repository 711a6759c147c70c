//! End-to-end tests for the entry lifecycle, payroll, and month close

use shared::{EntryStatus, FiscalMonthId};

mod common;
use common::{date, seeded_ledger};

use ledger::{ImportEntry, LedgerError};

/// Entry flows DRAFT → SUBMITTED → APPROVED → back to DRAFT on reopen
#[tokio::test]
async fn test_full_week_lifecycle() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;
    let week = date(2026, 1, 28);

    let entry = ledger
        .record_entry("Doug Kinsey", "Boyle", date(2026, 1, 29), 8.0, "demo")
        .await
        .unwrap();
    assert_eq!(entry.status, EntryStatus::Draft);

    let submission = ledger
        .submit_week("Doug Kinsey", week, Some("week done".to_string()))
        .await
        .unwrap();
    assert_eq!(submission.entry_count, 1);

    let submitted = ledger.entry(entry.id).await.unwrap().unwrap();
    assert_eq!(submitted.status, EntryStatus::Submitted);

    let approved = ledger.approve_entries(&[entry.id]).await.unwrap();
    assert_eq!(approved, 1);
    // Re-approval is a no-op, not an error
    assert_eq!(ledger.approve_entries(&[entry.id]).await.unwrap(), 0);

    let reopened = ledger.reopen_week("Doug Kinsey", week).await.unwrap();
    assert_eq!(reopened, 1);
    let draft_again = ledger.entry(entry.id).await.unwrap().unwrap();
    assert_eq!(draft_again.status, EntryStatus::Draft);
}

/// Editing a SUBMITTED entry fails with EntryLocked until reopened
#[tokio::test]
async fn test_submitted_entry_is_locked() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;

    ledger
        .record_entry("Doug Kinsey", "Boyle", date(2026, 1, 29), 8.0, "")
        .await
        .unwrap();
    ledger.submit_week("Doug Kinsey", date(2026, 1, 28), None).await.unwrap();

    let result = ledger
        .record_entry("Doug Kinsey", "Boyle", date(2026, 1, 29), 6.0, "")
        .await;
    assert!(matches!(result, Err(LedgerError::EntryLocked { .. })));

    // Reopen unlocks the edit
    ledger.reopen_week("Doug Kinsey", date(2026, 1, 28)).await.unwrap();
    let edited = ledger
        .record_entry("Doug Kinsey", "Boyle", date(2026, 1, 29), 6.0, "")
        .await
        .unwrap();
    assert_eq!(edited.hours, 6.0);
}

/// Retried writes for the same (employee, customer, date) never create a
/// second live row
#[tokio::test]
async fn test_retried_write_updates_instead_of_duplicating() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;

    let first = ledger
        .record_entry("Doug Kinsey", "Boyle", date(2026, 1, 29), 6.0, "first attempt")
        .await
        .unwrap();
    let second = ledger
        .record_entry("Doug Kinsey", "Boyle", date(2026, 1, 29), 6.0, "network retry")
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    let week_entries = ledger.entries_for_week("Doug Kinsey", date(2026, 1, 28)).await.unwrap();
    assert_eq!(week_entries.len(), 1);
    assert_eq!(week_entries[0].hours, 6.0);
}

/// Submitting an empty week is rejected
#[tokio::test]
async fn test_submit_empty_week_is_rejected() {
    let fixture = seeded_ledger().await;
    let result = fixture.ledger.submit_week("Doug Kinsey", date(2026, 1, 28), None).await;
    assert!(matches!(result, Err(LedgerError::EmptyWeek { .. })));
}

/// Unknown employees are an error; unknown customers are created
#[tokio::test]
async fn test_unknown_employee_vs_implicit_customer() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;

    let unknown = ledger
        .record_entry("Nobody Here", "Boyle", date(2026, 1, 29), 8.0, "")
        .await;
    assert!(matches!(unknown, Err(LedgerError::UnknownEmployee { .. })));

    // A brand-new customer name is created implicitly, once, however cased
    ledger.record_entry("Doug Kinsey", "Gonzalez", date(2026, 1, 29), 4.0, "").await.unwrap();
    ledger.record_entry("Boban Abbate", "GONZALEZ", date(2026, 1, 29), 4.0, "").await.unwrap();
    let health = ledger.health().await;
    assert_eq!(health.counts.customers, 1);
}

/// Aliases resolve to the same employee as the display name
#[tokio::test]
async fn test_alias_resolves_to_same_employee() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;

    let by_alias = ledger
        .record_entry("Doug", "Boyle", date(2026, 1, 29), 3.0, "")
        .await
        .unwrap();
    let by_name = ledger
        .record_entry("Doug Kinsey", "Boyle", date(2026, 1, 29), 4.0, "")
        .await
        .unwrap();
    assert_eq!(by_alias.id, by_name.id);
}

/// Payroll preview: overtime, meal exclusion, and rate overrides
#[tokio::test]
async fn test_week_payroll_preview() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;
    let week = date(2026, 1, 28);

    // 46 billable hours over the week plus a half-hour lunch each day
    for (day, hours) in [(28, 8.0), (29, 8.0), (30, 8.0), (31, 8.0), (1, 8.0), (2, 6.0)] {
        let month = if day >= 28 { 1 } else { 2 };
        ledger
            .record_entry("Doug Kinsey", "Boyle", date(2026, month, day), hours, "")
            .await
            .unwrap();
    }
    for day in [28, 29, 30] {
        ledger
            .record_entry("Doug Kinsey", "Lunch", date(2026, 1, day), 0.5, "")
            .await
            .unwrap();
    }

    let payroll = ledger.week_payroll("Doug Kinsey", week).await.unwrap();
    assert_eq!(payroll.work_hours, 46.0);
    assert_eq!(payroll.meal_hours, 1.5);
    assert_eq!(payroll.regular_hours, 40.0);
    assert_eq!(payroll.overtime_hours, 6.0);
    // 40 * 30 + 6 * 45
    assert_eq!(payroll.gross_pay, 1470.0);
}

/// A pair override beats the default rate for that customer only
#[tokio::test]
async fn test_rate_override_applies_per_customer() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;

    ledger.upsert_rate_override("Doug Kinsey", "Watkins", 42.5).await.unwrap();
    ledger.record_entry("Doug Kinsey", "Watkins", date(2026, 1, 28), 10.0, "").await.unwrap();
    ledger.record_entry("Doug Kinsey", "Boyle", date(2026, 1, 29), 10.0, "").await.unwrap();

    let payroll = ledger.week_payroll("Doug Kinsey", date(2026, 1, 28)).await.unwrap();
    assert_eq!(payroll.gross_pay, 10.0 * 42.5 + 10.0 * 30.0);

    assert_eq!(ledger.resolve_bill_rate("Doug Kinsey", "Watkins").await.unwrap(), 42.5);
    assert_eq!(ledger.resolve_bill_rate("Doug Kinsey", "Boyle").await.unwrap(), 30.0);
}

/// No configured rate anywhere is a hard error, not $0
#[tokio::test]
async fn test_missing_rate_is_loud() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;

    ledger.record_entry("Sean Matthew", "Boyle", date(2026, 1, 28), 8.0, "").await.unwrap();
    let result = ledger.week_payroll("Sean Matthew", date(2026, 1, 28)).await;
    assert!(matches!(result, Err(LedgerError::NoRateConfigured { .. })));
}

/// Close month archives aggregates, purges live rows, and locks the month
#[tokio::test]
async fn test_close_month_two_phase_flow() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;
    let month = FiscalMonthId(2); // weeks starting 1/28, 2/4, 2/11, 2/18

    let entry = ledger
        .record_entry("Doug Kinsey", "Boyle", date(2026, 1, 29), 40.0, "")
        .await
        .unwrap();
    ledger.submit_week("Doug Kinsey", date(2026, 1, 28), None).await.unwrap();
    ledger.approve_entries(&[entry.id]).await.unwrap();

    // Refuses without explicit confirmation
    let unconfirmed = ledger.close_month(month, false, false).await;
    assert!(matches!(unconfirmed, Err(LedgerError::Validation { .. })));

    let report = ledger.close_month(month, false, true).await.unwrap();
    assert_eq!(report.archived_rows, 1);
    assert_eq!(report.purged_entries, 1);

    // The live row is gone; the month is terminal
    assert!(ledger.entry(entry.id).await.unwrap().is_none());
    let rewrite = ledger.record_entry("Doug Kinsey", "Boyle", date(2026, 1, 29), 2.0, "").await;
    assert!(matches!(rewrite, Err(LedgerError::MonthClosed { .. })));
    let reopen = ledger.reopen_week("Doug Kinsey", date(2026, 1, 28)).await;
    assert!(matches!(reopen, Err(LedgerError::MonthClosed { .. })));
    let again = ledger.close_month(month, false, true).await;
    assert!(matches!(again, Err(LedgerError::MonthClosed { .. })));
}

/// Closing a month with unresolved work requires the explicit override
#[tokio::test]
async fn test_close_month_guards_unapproved_entries() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;
    let month = FiscalMonthId(2);

    ledger.record_entry("Doug Kinsey", "Boyle", date(2026, 1, 29), 8.0, "").await.unwrap();

    let guarded = ledger.close_month(month, false, true).await;
    assert!(matches!(guarded, Err(LedgerError::UnapprovedEntries { count: 1, .. })));

    let forced = ledger.close_month(month, true, true).await.unwrap();
    assert_eq!(forced.purged_entries, 1);
}

/// Bulk import is atomic: one bad row leaves the store untouched
#[tokio::test]
async fn test_import_entries_is_atomic() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;

    let rows = vec![
        ImportEntry {
            employee: "Doug Kinsey".to_string(),
            customer: "Boyle".to_string(),
            work_date: date(2026, 1, 29),
            hours: 8.0,
            notes: String::new(),
        },
        ImportEntry {
            employee: "Nobody Here".to_string(),
            customer: "Boyle".to_string(),
            work_date: date(2026, 1, 30),
            hours: 8.0,
            notes: String::new(),
        },
    ];

    let result = ledger.import_entries(&rows, EntryStatus::Approved).await;
    assert!(matches!(result, Err(LedgerError::UnknownEmployee { .. })));
    let entries = ledger.entries_for_week("Doug Kinsey", date(2026, 1, 28)).await.unwrap();
    assert!(entries.is_empty());

    // The valid batch applies with the forced status
    let report = ledger.import_entries(&rows[..1], EntryStatus::Approved).await.unwrap();
    assert_eq!(report.imported, 1);
    let entries = ledger.entries_for_week("Doug Kinsey", date(2026, 1, 28)).await.unwrap();
    assert_eq!(entries[0].status, EntryStatus::Approved);
}

/// Spoken-day entries always land in the current payroll week
#[tokio::test]
async fn test_spoken_entry_maps_to_current_week() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;

    let entry = ledger
        .record_spoken_entry("Doug Kinsey", "Boyle", "thurs", 8.0, "spoken")
        .await
        .unwrap();

    let today = chrono::Utc::now().date_naive();
    let expected = fixture
        .ledger
        .calendar()
        .date_for_spoken_day(today, chrono::Weekday::Thu);
    assert_eq!(entry.work_date, expected);

    let bad_day = ledger.record_spoken_entry("Doug Kinsey", "Boyle", "someday", 1.0, "").await;
    assert!(bad_day.is_err());
}
