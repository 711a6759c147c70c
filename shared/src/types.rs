//! Core shared types and identifiers

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reserved customer name for the non-billable meal deduction
pub const MEAL_CUSTOMER_NAME: &str = "Lunch";

/// Unique identifier for employees
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmployeeId(Uuid);

impl EmployeeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EmployeeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for customers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(Uuid);

impl CustomerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for time entries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fiscal month identifier: 1-based count of 4-4-5 months since the payroll epoch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FiscalMonthId(pub u32);

impl fmt::Display for FiscalMonthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fm_{}", self.0)
    }
}

/// Employee role within the timekeeping system
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeRole {
    Hourly,
    Admin,
}

/// Lifecycle status of a time entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    Draft,
    Submitted,
    Approved,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Draft => write!(f, "DRAFT"),
            EntryStatus::Submitted => write!(f, "SUBMITTED"),
            EntryStatus::Approved => write!(f, "APPROVED"),
        }
    }
}

/// An employee of record. Never hard-deleted; rate history depends on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    /// Alternate spoken/typed names that resolve to this employee
    #[serde(default)]
    pub aliases: Vec<String>,
    pub default_bill_rate: Option<f64>,
    pub default_pay_rate: Option<f64>,
    pub role: EmployeeRole,
}

/// A customer labor is billed against
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

impl Customer {
    /// True for the reserved non-billable meal-deduction customer
    pub fn is_meal(&self) -> bool {
        is_meal_customer(&self.name)
    }
}

/// Case-insensitive check for the reserved meal customer name
pub fn is_meal_customer(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(MEAL_CUSTOMER_NAME)
}

/// One recorded fact: (employee, customer, work_date) is the natural key
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: EntryId,
    pub employee_id: EmployeeId,
    pub customer_id: CustomerId,
    pub work_date: NaiveDate,
    pub hours: f64,
    #[serde(default)]
    pub notes: String,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Negotiated bill rate for a specific (employee, customer) pairing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateOverride {
    pub employee_id: EmployeeId,
    pub customer_id: CustomerId,
    pub bill_rate: f64,
}

/// Immutable aggregate written when a fiscal month is closed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub fiscal_month: FiscalMonthId,
    pub employee_name: String,
    pub customer_name: String,
    pub hours: f64,
    pub gross_pay: f64,
    pub closed_at: DateTime<Utc>,
}

/// Audit row recorded when an employee submits a week
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeekSubmission {
    pub employee_id: EmployeeId,
    pub week_start: NaiveDate,
    #[serde(default)]
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub entry_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meal_customer_is_case_insensitive() {
        assert!(is_meal_customer("Lunch"));
        assert!(is_meal_customer("lunch"));
        assert!(is_meal_customer(" LUNCH "));
        assert!(!is_meal_customer("Lunchroom Remodel"));
    }

    #[test]
    fn test_entry_status_display() {
        assert_eq!(EntryStatus::Draft.to_string(), "DRAFT");
        assert_eq!(EntryStatus::Submitted.to_string(), "SUBMITTED");
        assert_eq!(EntryStatus::Approved.to_string(), "APPROVED");
    }

    #[test]
    fn test_fiscal_month_display() {
        assert_eq!(FiscalMonthId(2).to_string(), "fm_2");
    }
}
