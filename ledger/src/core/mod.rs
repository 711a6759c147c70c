//! Pure domain logic: calendar math, the domain store, payroll
//! computation, and reconciliation. No I/O lives here.

pub mod calendar;
pub mod payroll;
pub mod reconcile;
pub mod store;

pub use calendar::{week_end_of, week_start_of, PayrollCalendar};
pub use payroll::{compute_week, WeekPayroll};
pub use reconcile::{reconcile, ReconciliationReport};
pub use store::{DomainStore, MergeStats, RowCounts};
