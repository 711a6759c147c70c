//! Reconciliation engine: live store vs an external authoritative dataset
//!
//! Produces a typed discrepancy list and sanity flags. Discrepancies are
//! data, not errors; the engine never mutates anything. Applying fixes is
//! a separate human/admin step.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::payroll::round2;

/// Hours within this tolerance of each other are considered equal
pub const HOURS_TOLERANCE: f64 = 0.01;

/// More than this many meal hours on one day is flagged as a likely
/// data-entry defect
pub const MEAL_DAILY_SANITY_HOURS: f64 = 1.0;

/// One (employee, customer, hours) tuple from the authoritative dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedHours {
    pub employee: String,
    pub customer: String,
    pub hours: f64,
}

/// Classification of one (employee, customer) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiscrepancyKind {
    Match,
    Missing,
    Adjust,
    Extra,
}

/// Proposed fix for a discrepancy; EXTRA pairs carry none — they need
/// human judgment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProposedFix {
    AddHours { hours: f64 },
    SetHours { from: f64, to: f64, delta: f64 },
}

/// One reconciliation finding for an (employee, customer) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub employee: String,
    pub customer: String,
    pub live_hours: f64,
    pub expected_hours: f64,
    pub kind: DiscrepancyKind,
    pub proposed_fix: Option<ProposedFix>,
}

/// A day where one employee's meal hours exceed the sanity bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealFlag {
    pub employee: String,
    pub work_date: NaiveDate,
    pub hours: f64,
}

/// Full output of one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub discrepancies: Vec<Discrepancy>,
    pub meal_flags: Vec<MealFlag>,
}

impl ReconciliationReport {
    pub fn matches(&self) -> usize {
        self.count(DiscrepancyKind::Match)
    }

    pub fn count(&self, kind: DiscrepancyKind) -> usize {
        self.discrepancies.iter().filter(|d| d.kind == kind).count()
    }

    /// True when every pair matched and nothing was flagged
    pub fn is_clean(&self) -> bool {
        self.meal_flags.is_empty() && self.discrepancies.iter().all(|d| d.kind == DiscrepancyKind::Match)
    }
}

/// Diff live (employee, customer) hour sums against the authoritative
/// dataset over the union of both key sets.
pub fn reconcile(
    range_start: NaiveDate,
    range_end: NaiveDate,
    live: &BTreeMap<(String, String), f64>,
    expected: &[ExpectedHours],
    meal_by_day: &BTreeMap<(String, NaiveDate), f64>,
) -> ReconciliationReport {
    let mut expected_sums: BTreeMap<(String, String), f64> = BTreeMap::new();
    for row in expected {
        *expected_sums
            .entry((row.employee.clone(), row.customer.clone()))
            .or_insert(0.0) += row.hours;
    }

    let keys: BTreeSet<(String, String)> =
        live.keys().cloned().chain(expected_sums.keys().cloned()).collect();

    let mut discrepancies = Vec::with_capacity(keys.len());
    for key in keys {
        let live_hours = live.get(&key).copied().unwrap_or(0.0);
        let in_expected = expected_sums.contains_key(&key);
        let expected_hours = expected_sums.get(&key).copied().unwrap_or(0.0);

        // Tolerance is checked on raw sums; rounding happens only in the
        // reported figures
        let (kind, proposed_fix) = if (live_hours - expected_hours).abs() < HOURS_TOLERANCE {
            (DiscrepancyKind::Match, None)
        } else if live_hours == 0.0 && expected_hours > 0.0 {
            (DiscrepancyKind::Missing, Some(ProposedFix::AddHours { hours: round2(expected_hours) }))
        } else if !in_expected && live_hours > 0.0 {
            (DiscrepancyKind::Extra, None)
        } else {
            (
                DiscrepancyKind::Adjust,
                Some(ProposedFix::SetHours {
                    from: round2(live_hours),
                    to: round2(expected_hours),
                    delta: round2(expected_hours - live_hours),
                }),
            )
        };

        discrepancies.push(Discrepancy {
            employee: key.0,
            customer: key.1,
            live_hours: round2(live_hours),
            expected_hours: round2(expected_hours),
            kind,
            proposed_fix,
        });
    }

    let meal_flags = meal_by_day
        .iter()
        .filter(|(_, hours)| **hours > MEAL_DAILY_SANITY_HOURS)
        .map(|((employee, work_date), hours)| MealFlag {
            employee: employee.clone(),
            work_date: *work_date,
            hours: *hours,
        })
        .collect();

    ReconciliationReport { range_start, range_end, discrepancies, meal_flags }
}
