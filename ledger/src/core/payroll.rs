//! Pure weekly payroll computation
//!
//! Given one employee's entries for one payroll week, with bill rates
//! already resolved per (employee, customer) pair, computes the gross pay:
//! meal entries are excluded from work hours, overtime splits at 40 hours
//! on total weekly work hours, and the overtime premium is allocated
//! pro-rata across customer buckets by hours worked for each customer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use shared::CustomerId;

/// Weekly hours threshold above which overtime applies
pub const OVERTIME_WEEKLY_THRESHOLD: f64 = 40.0;

/// Overtime pay multiplier
pub const OVERTIME_MULTIPLIER: f64 = 1.5;

/// Round a dollar or hour amount to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One entry line feeding the weekly computation, rate already resolved.
/// Meal lines carry no bill rate.
#[derive(Debug, Clone)]
pub struct PayLine {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub hours: f64,
    pub bill_rate: f64,
    pub meal: bool,
}

/// Per-customer pay bucket within one week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerBucket {
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub hours: f64,
    pub bill_rate: f64,
    /// Share of the week's overtime hours allocated to this bucket
    pub overtime_hours: f64,
    pub pay: f64,
}

/// Computed payroll for one employee over one payroll week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekPayroll {
    pub week_start: NaiveDate,
    pub work_hours: f64,
    /// Informational only; never affects pay or overtime
    pub meal_hours: f64,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub gross_pay: f64,
    pub buckets: Vec<CustomerBucket>,
}

/// Compute one employee's weekly payroll from resolved pay lines.
///
/// The regular/overtime split is a function of total weekly work hours,
/// not of any single customer; each bucket then receives
/// `overtime * (bucket_hours / work_hours)` of the overtime and is paid
/// `hours * rate + ot_share * rate * (multiplier - 1)`.
pub fn compute_week(week_start: NaiveDate, lines: &[PayLine]) -> WeekPayroll {
    let mut meal_hours = 0.0;
    // Keyed by customer id; one rate per customer since rates resolve per pair
    let mut grouped: BTreeMap<CustomerId, (String, f64, f64)> = BTreeMap::new();

    for line in lines {
        if line.meal {
            meal_hours += line.hours;
            continue;
        }
        let slot = grouped
            .entry(line.customer_id)
            .or_insert_with(|| (line.customer_name.clone(), 0.0, line.bill_rate));
        slot.1 += line.hours;
        slot.2 = line.bill_rate;
    }

    let work_hours: f64 = grouped.values().map(|(_, hours, _)| hours).sum();
    let regular_hours = work_hours.min(OVERTIME_WEEKLY_THRESHOLD);
    let overtime_hours = (work_hours - OVERTIME_WEEKLY_THRESHOLD).max(0.0);

    let mut buckets = Vec::with_capacity(grouped.len());
    let mut gross = 0.0;
    for (customer_id, (customer_name, hours, rate)) in grouped {
        let ot_share = if work_hours > 0.0 {
            overtime_hours * (hours / work_hours)
        } else {
            0.0
        };
        let pay = hours * rate + ot_share * rate * (OVERTIME_MULTIPLIER - 1.0);
        gross += pay;
        buckets.push(CustomerBucket {
            customer_id,
            customer_name,
            hours: round2(hours),
            bill_rate: rate,
            overtime_hours: round2(ot_share),
            pay: round2(pay),
        });
    }

    WeekPayroll {
        week_start,
        work_hours: round2(work_hours),
        meal_hours: round2(meal_hours),
        regular_hours: round2(regular_hours),
        overtime_hours: round2(overtime_hours),
        gross_pay: round2(gross),
        buckets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 28).unwrap()
    }

    fn line(customer: CustomerId, name: &str, hours: f64, rate: f64) -> PayLine {
        PayLine {
            customer_id: customer,
            customer_name: name.to_string(),
            hours,
            bill_rate: rate,
            meal: false,
        }
    }

    fn meal_line(customer: CustomerId, hours: f64) -> PayLine {
        PayLine {
            customer_id: customer,
            customer_name: "Lunch".to_string(),
            hours,
            bill_rate: 0.0,
            meal: true,
        }
    }

    #[test]
    fn test_overtime_split_at_forty_hours() {
        // 46 hours at $30: regular 40 * 30 = 1200, overtime 6 * 45 = 270
        let customer = CustomerId::new();
        let result = compute_week(week(), &[line(customer, "Boyle", 46.0, 30.0)]);

        assert_eq!(result.work_hours, 46.0);
        assert_eq!(result.regular_hours, 40.0);
        assert_eq!(result.overtime_hours, 6.0);
        assert_eq!(result.gross_pay, 1470.0);
    }

    #[test]
    fn test_no_overtime_at_or_below_forty() {
        let customer = CustomerId::new();
        let result = compute_week(week(), &[line(customer, "Boyle", 40.0, 30.0)]);
        assert_eq!(result.overtime_hours, 0.0);
        assert_eq!(result.gross_pay, 1200.0);
    }

    #[test]
    fn test_meal_hours_excluded_from_work_and_overtime() {
        // 40 work hours plus five half-hour lunches: still no overtime,
        // lunch never affects gross pay
        let customer = CustomerId::new();
        let lunch = CustomerId::new();
        let lines = vec![
            line(customer, "Watkins", 40.0, 30.0),
            meal_line(lunch, 0.5),
            meal_line(lunch, 0.5),
            meal_line(lunch, 0.5),
            meal_line(lunch, 0.5),
            meal_line(lunch, 0.5),
        ];
        let result = compute_week(week(), &lines);

        assert_eq!(result.work_hours, 40.0);
        assert_eq!(result.meal_hours, 2.5);
        assert_eq!(result.overtime_hours, 0.0);
        assert_eq!(result.gross_pay, 1200.0);
        assert_eq!(result.buckets.len(), 1);
    }

    #[test]
    fn test_overtime_premium_allocated_pro_rata_across_customers() {
        // 23h at $30 for A, 23h at $40 for B: 46 total, 6 OT hours
        // split evenly (3 each). A: 23*30 + 3*15 = 735, B: 23*40 + 3*20 = 980
        let a = CustomerId::new();
        let b = CustomerId::new();
        let result = compute_week(
            week(),
            &[line(a, "Boyle", 23.0, 30.0), line(b, "Landy", 23.0, 40.0)],
        );

        assert_eq!(result.work_hours, 46.0);
        assert_eq!(result.overtime_hours, 6.0);
        assert_eq!(result.gross_pay, 1715.0);

        let bucket_a = result.buckets.iter().find(|x| x.customer_id == a).unwrap();
        let bucket_b = result.buckets.iter().find(|x| x.customer_id == b).unwrap();
        assert_eq!(bucket_a.overtime_hours, 3.0);
        assert_eq!(bucket_b.overtime_hours, 3.0);
        assert_eq!(bucket_a.pay, 735.0);
        assert_eq!(bucket_b.pay, 980.0);
    }

    #[test]
    fn test_pro_rata_allocation_uneven_hours() {
        // 30h + 16h = 46h, 6 OT hours; A gets 6*30/46, B gets 6*16/46
        let a = CustomerId::new();
        let b = CustomerId::new();
        let result = compute_week(
            week(),
            &[line(a, "Boyle", 30.0, 30.0), line(b, "Landy", 16.0, 40.0)],
        );

        let bucket_a = result.buckets.iter().find(|x| x.customer_id == a).unwrap();
        let bucket_b = result.buckets.iter().find(|x| x.customer_id == b).unwrap();
        assert_eq!(bucket_a.overtime_hours, round2(6.0 * 30.0 / 46.0));
        assert_eq!(bucket_b.overtime_hours, round2(6.0 * 16.0 / 46.0));

        // Bucket pays sum to the gross
        let sum: f64 = bucket_a.pay + bucket_b.pay;
        assert!((sum - result.gross_pay).abs() < 0.02);
    }

    #[test]
    fn test_same_customer_lines_merge_into_one_bucket() {
        let a = CustomerId::new();
        let result = compute_week(
            week(),
            &[line(a, "Boyle", 8.0, 30.0), line(a, "Boyle", 9.0, 30.0)],
        );
        assert_eq!(result.buckets.len(), 1);
        assert_eq!(result.buckets[0].hours, 17.0);
        assert_eq!(result.gross_pay, 510.0);
    }

    #[test]
    fn test_empty_week_is_all_zero() {
        let result = compute_week(week(), &[]);
        assert_eq!(result.work_hours, 0.0);
        assert_eq!(result.gross_pay, 0.0);
        assert!(result.buckets.is_empty());
    }
}
