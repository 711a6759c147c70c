//! Reconciliation against an authoritative external dataset

mod common;
use common::{date, seeded_ledger};

use ledger::core::reconcile::{DiscrepancyKind, ExpectedHours, ProposedFix};

fn expected(employee: &str, customer: &str, hours: f64) -> ExpectedHours {
    ExpectedHours {
        employee: employee.to_string(),
        customer: customer.to_string(),
        hours,
    }
}

/// Live vs expected over the union of pairs: MATCH, MISSING, ADJUST, EXTRA
#[tokio::test]
async fn test_reconcile_classifies_each_pair() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;

    ledger.record_entry("Doug Kinsey", "Boyle", date(2026, 1, 28), 19.5, "").await.unwrap();
    ledger.record_entry("Doug Kinsey", "Lynn", date(2026, 1, 29), 5.5, "").await.unwrap();
    ledger.record_entry("Boban Abbate", "Walsh", date(2026, 1, 30), 0.5, "").await.unwrap();

    let authoritative = vec![
        // Matches within the 0.01h tolerance
        expected("Doug Kinsey", "Boyle", 19.505),
        // Live has 5.5, truth says 8: adjust
        expected("Doug Kinsey", "Lynn", 8.0),
        // Absent from live entirely: missing
        expected("Sean Matthew", "Boyle", 25.0),
        // Boban/Walsh is live-only: extra, no automatic fix
    ];

    let report = ledger
        .reconcile_range(date(2026, 1, 28), date(2026, 2, 3), &authoritative)
        .await
        .unwrap();

    assert_eq!(report.discrepancies.len(), 4);
    assert_eq!(report.count(DiscrepancyKind::Match), 1);
    assert_eq!(report.count(DiscrepancyKind::Adjust), 1);
    assert_eq!(report.count(DiscrepancyKind::Missing), 1);
    assert_eq!(report.count(DiscrepancyKind::Extra), 1);

    let missing = report
        .discrepancies
        .iter()
        .find(|d| d.kind == DiscrepancyKind::Missing)
        .unwrap();
    assert_eq!(missing.employee, "Sean Matthew");
    assert_eq!(missing.proposed_fix, Some(ProposedFix::AddHours { hours: 25.0 }));

    let extra = report
        .discrepancies
        .iter()
        .find(|d| d.kind == DiscrepancyKind::Extra)
        .unwrap();
    assert!(extra.proposed_fix.is_none());
}

/// Meal entries stay out of the work-hour aggregates but oversized ones
/// are flagged
#[tokio::test]
async fn test_meal_entries_excluded_but_sanity_checked() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;

    ledger.record_entry("Doug Kinsey", "Boyle", date(2026, 1, 28), 8.0, "").await.unwrap();
    ledger.record_entry("Doug Kinsey", "Lunch", date(2026, 1, 28), 0.5, "").await.unwrap();
    // The classic defect: a 12.5-hour "lunch"
    ledger.record_entry("Boban Abbate", "Lunch", date(2026, 1, 29), 12.5, "").await.unwrap();

    let authoritative = vec![expected("Doug Kinsey", "Boyle", 8.0)];
    let report = ledger
        .reconcile_range(date(2026, 1, 28), date(2026, 2, 3), &authoritative)
        .await
        .unwrap();

    // Lunch buckets never show up as EXTRA work
    assert_eq!(report.discrepancies.len(), 1);
    assert_eq!(report.discrepancies[0].kind, DiscrepancyKind::Match);

    // Only the oversized lunch is flagged
    assert_eq!(report.meal_flags.len(), 1);
    assert_eq!(report.meal_flags[0].employee, "Boban Abbate");
    assert_eq!(report.meal_flags[0].hours, 12.5);
    assert!(!report.is_clean());
}

/// Reconciliation reads only; the live store is unchanged afterwards
#[tokio::test]
async fn test_reconcile_never_mutates() {
    let fixture = seeded_ledger().await;
    let ledger = &fixture.ledger;

    ledger.record_entry("Doug Kinsey", "Boyle", date(2026, 1, 28), 5.0, "").await.unwrap();
    let before = ledger.health().await.counts;

    let authoritative = vec![expected("Doug Kinsey", "Boyle", 40.0), expected("Sean Matthew", "Lynn", 8.0)];
    let report = ledger
        .reconcile_range(date(2026, 1, 28), date(2026, 2, 3), &authoritative)
        .await
        .unwrap();
    assert!(!report.is_clean());

    assert_eq!(ledger.health().await.counts, before);
    let entries = ledger.entries_for_week("Doug Kinsey", date(2026, 1, 28)).await.unwrap();
    assert_eq!(entries[0].hours, 5.0);
}
