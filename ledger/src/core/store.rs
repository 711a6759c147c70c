//! Domain store: entities, integrity invariants, and the week/month
//! state machine
//!
//! The store is a single serializable document. Secondary indexes (natural
//! keys, name lookups) are never serialized; callers must invoke
//! `rebuild_indexes` after deserializing. All mutation goes through the
//! methods here; multi-row mutations validate fully before applying so a
//! failed call never leaves partial state.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use shared::{
    ArchiveRecord, Customer, CustomerId, Employee, EmployeeId, EmployeeRole, EntryId, EntryStatus,
    FiscalMonthId, RateOverride, TimeEntry, WeekSubmission,
};

use crate::core::calendar::{week_start_of, PayrollCalendar};
use crate::core::payroll::{compute_week, round2, PayLine};
use crate::error::{LedgerError, LedgerResult};

/// Natural identity of one ledger fact
pub type NaturalKey = (EmployeeId, CustomerId, NaiveDate);

/// Live row counts for health reporting and backup guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounts {
    pub employees: usize,
    pub customers: usize,
    pub entries: usize,
    pub rate_overrides: usize,
    pub archives: usize,
}

/// Outcome of a merge-restore pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub employees_added: usize,
    pub customers_added: usize,
    pub entries_added: usize,
    pub entries_updated: usize,
    pub overrides_added: usize,
}

impl MergeStats {
    pub fn is_noop(&self) -> bool {
        self.employees_added == 0
            && self.customers_added == 0
            && self.entries_added == 0
            && self.entries_updated == 0
            && self.overrides_added == 0
    }
}

/// Normalize a display name for matching: trimmed, lowercased, single spaces
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// The relational store owning all four entities plus the archive
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainStore {
    #[serde(default)]
    employees: BTreeMap<EmployeeId, Employee>,
    #[serde(default)]
    customers: BTreeMap<CustomerId, Customer>,
    #[serde(default)]
    entries: BTreeMap<EntryId, TimeEntry>,
    #[serde(default)]
    rate_overrides: Vec<RateOverride>,
    /// Append-only aggregates of closed fiscal months
    #[serde(default)]
    archives: Vec<ArchiveRecord>,
    #[serde(default)]
    submissions: Vec<WeekSubmission>,
    #[serde(default)]
    closed_months: BTreeSet<u32>,

    #[serde(skip)]
    entry_by_key: HashMap<NaturalKey, EntryId>,
    #[serde(skip)]
    employee_by_name: HashMap<String, EmployeeId>,
    #[serde(skip)]
    customer_by_name: HashMap<String, CustomerId>,
}

impl DomainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the skipped secondary indexes. Must be called after
    /// deserializing a store document.
    pub fn rebuild_indexes(&mut self) {
        self.entry_by_key.clear();
        self.employee_by_name.clear();
        self.customer_by_name.clear();

        for entry in self.entries.values() {
            self.entry_by_key
                .insert((entry.employee_id, entry.customer_id, entry.work_date), entry.id);
        }
        for employee in self.employees.values() {
            self.employee_by_name.insert(normalize_name(&employee.name), employee.id);
            for alias in &employee.aliases {
                self.employee_by_name.insert(normalize_name(alias), employee.id);
            }
        }
        for customer in self.customers.values() {
            self.customer_by_name.insert(normalize_name(&customer.name), customer.id);
        }
    }

    // Employees

    /// Create an employee. Names and aliases must not collide with any
    /// existing employee's name or aliases.
    pub fn add_employee(
        &mut self,
        name: &str,
        aliases: Vec<String>,
        default_bill_rate: Option<f64>,
        default_pay_rate: Option<f64>,
        role: EmployeeRole,
    ) -> LedgerResult<Employee> {
        let key = normalize_name(name);
        if key.is_empty() {
            return Err(LedgerError::validation("employee name must not be empty"));
        }
        if self.employee_by_name.contains_key(&key) {
            return Err(LedgerError::validation(format!(
                "employee name '{name}' is already in use"
            )));
        }
        for alias in &aliases {
            let alias_key = normalize_name(alias);
            if alias_key.is_empty() || self.employee_by_name.contains_key(&alias_key) {
                return Err(LedgerError::validation(format!(
                    "employee alias '{alias}' collides with an existing employee"
                )));
            }
        }

        let employee = Employee {
            id: EmployeeId::new(),
            name: name.trim().to_string(),
            aliases: aliases.clone(),
            default_bill_rate,
            default_pay_rate,
            role,
        };
        self.employee_by_name.insert(key, employee.id);
        for alias in &aliases {
            self.employee_by_name.insert(normalize_name(alias), employee.id);
        }
        self.employees.insert(employee.id, employee.clone());
        Ok(employee)
    }

    /// Look up an employee by display name or alias (case-insensitive)
    pub fn find_employee(&self, name: &str) -> Option<&Employee> {
        self.employee_by_name
            .get(&normalize_name(name))
            .and_then(|id| self.employees.get(id))
    }

    /// Like `find_employee`, but an unknown name is an error
    pub fn require_employee(&self, name: &str) -> LedgerResult<&Employee> {
        self.find_employee(name)
            .ok_or_else(|| LedgerError::UnknownEmployee { name: name.to_string() })
    }

    pub fn employee(&self, id: EmployeeId) -> Option<&Employee> {
        self.employees.get(&id)
    }

    pub fn employees(&self) -> impl Iterator<Item = &Employee> {
        self.employees.values()
    }

    // Customers

    /// Find a customer by name (case-insensitive) or create it.
    ///
    /// The name index acts as the uniqueness constraint: all callers race
    /// through the store's single writer, so the same new name always
    /// resolves to the same row, never two.
    pub fn find_or_create_customer(
        &mut self,
        name: &str,
        address: Option<String>,
    ) -> LedgerResult<(Customer, bool)> {
        let key = normalize_name(name);
        if key.is_empty() {
            return Err(LedgerError::validation("customer name must not be empty"));
        }
        if let Some(id) = self.customer_by_name.get(&key) {
            let customer = self.customers.get(id).expect("name index points at live row");
            return Ok((customer.clone(), false));
        }

        let customer = Customer {
            id: CustomerId::new(),
            name: name.trim().to_string(),
            address,
        };
        self.customer_by_name.insert(key, customer.id);
        self.customers.insert(customer.id, customer.clone());
        Ok((customer, true))
    }

    pub fn customer(&self, id: CustomerId) -> Option<&Customer> {
        self.customers.get(&id)
    }

    pub fn find_customer(&self, name: &str) -> Option<&Customer> {
        self.customer_by_name
            .get(&normalize_name(name))
            .and_then(|id| self.customers.get(id))
    }

    // Rates

    /// Upsert a negotiated rate for an (employee, customer) pair.
    /// Last write wins on the unique pair.
    pub fn upsert_rate_override(
        &mut self,
        employee_id: EmployeeId,
        customer_id: CustomerId,
        bill_rate: f64,
    ) -> LedgerResult<()> {
        if !bill_rate.is_finite() || bill_rate <= 0.0 {
            return Err(LedgerError::validation(format!(
                "bill rate must be a positive number, got {bill_rate}"
            )));
        }
        if !self.employees.contains_key(&employee_id) {
            return Err(LedgerError::validation(format!("unknown employee id {employee_id}")));
        }
        if !self.customers.contains_key(&customer_id) {
            return Err(LedgerError::validation(format!("unknown customer id {customer_id}")));
        }

        match self
            .rate_overrides
            .iter_mut()
            .find(|o| o.employee_id == employee_id && o.customer_id == customer_id)
        {
            Some(existing) => existing.bill_rate = bill_rate,
            None => self.rate_overrides.push(RateOverride { employee_id, customer_id, bill_rate }),
        }
        Ok(())
    }

    /// Resolve the bill rate for an (employee, customer) pair: the pair
    /// override if present, else the employee default. No configured rate
    /// at all is a hard error, never a silent zero.
    pub fn resolve_bill_rate(
        &self,
        employee_id: EmployeeId,
        customer_id: CustomerId,
    ) -> LedgerResult<f64> {
        if let Some(rate) = self
            .rate_overrides
            .iter()
            .find(|o| o.employee_id == employee_id && o.customer_id == customer_id)
        {
            return Ok(rate.bill_rate);
        }
        let employee = self
            .employees
            .get(&employee_id)
            .ok_or_else(|| LedgerError::validation(format!("unknown employee id {employee_id}")))?;
        employee.default_bill_rate.ok_or_else(|| LedgerError::NoRateConfigured {
            employee: employee.name.clone(),
            customer: self
                .customers
                .get(&customer_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| customer_id.to_string()),
        })
    }

    pub fn rate_overrides(&self) -> &[RateOverride] {
        &self.rate_overrides
    }

    // Time entries

    /// Upsert a time entry on its natural key (employee, customer, date).
    ///
    /// A second write for the same tuple updates the existing DRAFT row's
    /// hours/notes instead of inserting; retried submissions can never
    /// produce duplicate rows. Locked rows must be reopened first.
    pub fn upsert_time_entry(
        &mut self,
        calendar: &PayrollCalendar,
        employee_id: EmployeeId,
        customer_id: CustomerId,
        work_date: NaiveDate,
        hours: f64,
        notes: &str,
        now: DateTime<Utc>,
    ) -> LedgerResult<TimeEntry> {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(LedgerError::validation(format!(
                "hours must be a positive number, got {hours}"
            )));
        }
        if !self.employees.contains_key(&employee_id) {
            return Err(LedgerError::validation(format!("unknown employee id {employee_id}")));
        }
        if !self.customers.contains_key(&customer_id) {
            return Err(LedgerError::validation(format!("unknown customer id {customer_id}")));
        }
        let month = calendar.month_of(work_date)?;
        if self.closed_months.contains(&month.0) {
            return Err(LedgerError::MonthClosed { month });
        }

        let key = (employee_id, customer_id, work_date);
        if let Some(entry_id) = self.entry_by_key.get(&key).copied() {
            let entry = self.entries.get_mut(&entry_id).expect("natural key index points at live row");
            if entry.status != EntryStatus::Draft {
                return Err(LedgerError::EntryLocked { entry_id, status: entry.status });
            }
            entry.hours = hours;
            entry.notes = notes.to_string();
            entry.updated_at = now;
            return Ok(entry.clone());
        }

        let entry = TimeEntry {
            id: EntryId::new(),
            employee_id,
            customer_id,
            work_date,
            hours,
            notes: notes.to_string(),
            status: EntryStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        self.entry_by_key.insert(key, entry.id);
        self.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    pub fn entry(&self, id: EntryId) -> Option<&TimeEntry> {
        self.entries.get(&id)
    }

    /// All of one employee's entries in the payroll week containing
    /// `week_start`
    pub fn entries_for_week(&self, employee_id: EmployeeId, week_start: NaiveDate) -> Vec<&TimeEntry> {
        let start = week_start_of(week_start);
        let end = start + Duration::days(6);
        self.entries
            .values()
            .filter(|e| e.employee_id == employee_id && e.work_date >= start && e.work_date <= end)
            .collect()
    }

    /// All live entries with work dates in the inclusive range
    pub fn entries_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<&TimeEntry> {
        self.entries
            .values()
            .filter(|e| e.work_date >= start && e.work_date <= end)
            .collect()
    }

    // Week state machine

    /// Transition every DRAFT entry in the employee's week to SUBMITTED.
    /// A week with no entries at all cannot be submitted.
    pub fn submit_week(
        &mut self,
        employee_id: EmployeeId,
        week_start: NaiveDate,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> LedgerResult<WeekSubmission> {
        let start = week_start_of(week_start);
        let ids: Vec<EntryId> = self
            .entries_for_week(employee_id, start)
            .iter()
            .map(|e| e.id)
            .collect();
        if ids.is_empty() {
            let employee = self
                .employees
                .get(&employee_id)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| employee_id.to_string());
            return Err(LedgerError::EmptyWeek { employee, week_start: start });
        }

        let mut transitioned = 0;
        for id in ids {
            let entry = self.entries.get_mut(&id).expect("id collected from live rows");
            if entry.status == EntryStatus::Draft {
                entry.status = EntryStatus::Submitted;
                entry.updated_at = now;
                transitioned += 1;
            }
        }

        let submission = WeekSubmission {
            employee_id,
            week_start: start,
            comment,
            submitted_at: now,
            entry_count: transitioned,
        };
        self.submissions.push(submission.clone());
        Ok(submission)
    }

    /// Approve entries by id, individually or in bulk. Approving an
    /// already-APPROVED entry is a no-op; approving a DRAFT is rejected.
    /// Validates the whole batch before touching any row.
    pub fn approve_entries(&mut self, ids: &[EntryId], now: DateTime<Utc>) -> LedgerResult<u32> {
        for id in ids {
            match self.entries.get(id) {
                None => return Err(LedgerError::UnknownEntry { entry_id: *id }),
                Some(entry) if entry.status == EntryStatus::Draft => {
                    return Err(LedgerError::validation(format!(
                        "entry {id} is still DRAFT; the week must be submitted before approval"
                    )));
                }
                Some(_) => {}
            }
        }

        let mut approved = 0;
        for id in ids {
            let entry = self.entries.get_mut(id).expect("batch validated above");
            if entry.status == EntryStatus::Submitted {
                entry.status = EntryStatus::Approved;
                entry.updated_at = now;
                approved += 1;
            }
        }
        Ok(approved)
    }

    /// Force an entry's status directly. Admin import path only: the
    /// regular lifecycle goes through submit/approve.
    pub fn force_entry_status(
        &mut self,
        id: EntryId,
        status: EntryStatus,
        now: DateTime<Utc>,
    ) -> LedgerResult<()> {
        let entry = self
            .entries
            .get_mut(&id)
            .ok_or(LedgerError::UnknownEntry { entry_id: id })?;
        if entry.status != status {
            entry.status = status;
            entry.updated_at = now;
        }
        Ok(())
    }

    /// Move an employee's SUBMITTED/APPROVED entries for a week back to
    /// DRAFT so they can be edited and resubmitted.
    pub fn reopen_week(
        &mut self,
        calendar: &PayrollCalendar,
        employee_id: EmployeeId,
        week_start: NaiveDate,
        now: DateTime<Utc>,
    ) -> LedgerResult<u32> {
        let start = week_start_of(week_start);
        let month = calendar.month_of(start)?;
        if self.closed_months.contains(&month.0) {
            return Err(LedgerError::MonthClosed { month });
        }

        let ids: Vec<EntryId> = self
            .entries_for_week(employee_id, start)
            .iter()
            .filter(|e| e.status != EntryStatus::Draft)
            .map(|e| e.id)
            .collect();
        let reopened = ids.len() as u32;
        for id in ids {
            let entry = self.entries.get_mut(&id).expect("id collected from live rows");
            entry.status = EntryStatus::Draft;
            entry.updated_at = now;
        }
        Ok(reopened)
    }

    pub fn submissions(&self) -> &[WeekSubmission] {
        &self.submissions
    }

    // Month close

    pub fn is_month_closed(&self, month: FiscalMonthId) -> bool {
        self.closed_months.contains(&month.0)
    }

    /// Compute the archive rows for closing a fiscal month. Pure read;
    /// fails if the month is already closed, has no live entries, or has
    /// non-APPROVED entries without `force`.
    pub fn month_close_rows(
        &self,
        calendar: &PayrollCalendar,
        month: FiscalMonthId,
        force: bool,
        now: DateTime<Utc>,
    ) -> LedgerResult<Vec<ArchiveRecord>> {
        if self.closed_months.contains(&month.0) {
            return Err(LedgerError::MonthClosed { month });
        }
        let (start, end) = calendar.month_range(month);
        let live = self.entries_in_range(start, end);
        if live.is_empty() {
            return Err(LedgerError::validation(format!(
                "fiscal month {month} has no live entries to close"
            )));
        }
        let unapproved = live.iter().filter(|e| e.status != EntryStatus::Approved).count() as u32;
        if unapproved > 0 && !force {
            return Err(LedgerError::UnapprovedEntries { month, count: unapproved });
        }

        // Aggregate pay per (employee, customer) across the month's weeks.
        // Overtime is a weekly computation, so each week is computed
        // separately and its buckets summed into the month totals.
        let mut by_employee: BTreeMap<EmployeeId, Vec<&TimeEntry>> = BTreeMap::new();
        for entry in &live {
            by_employee.entry(entry.employee_id).or_default().push(*entry);
        }

        let mut totals: BTreeMap<(String, String), (f64, f64)> = BTreeMap::new();
        for (employee_id, employee_entries) in by_employee {
            let employee_name = self
                .employees
                .get(&employee_id)
                .map(|e| e.name.clone())
                .unwrap_or_else(|| employee_id.to_string());

            for week_start in calendar.month_week_starts(month) {
                let week_end = week_start + Duration::days(6);
                let mut lines = Vec::new();
                for entry in employee_entries
                    .iter()
                    .filter(|e| e.work_date >= week_start && e.work_date <= week_end)
                {
                    lines.push(self.pay_line_for(entry)?);
                }
                if lines.is_empty() {
                    continue;
                }
                let week = compute_week(week_start, &lines);
                for bucket in &week.buckets {
                    let slot = totals
                        .entry((employee_name.clone(), bucket.customer_name.clone()))
                        .or_insert((0.0, 0.0));
                    slot.0 += bucket.hours;
                    slot.1 += bucket.pay;
                }
                if week.meal_hours > 0.0 {
                    let slot = totals
                        .entry((employee_name.clone(), shared::MEAL_CUSTOMER_NAME.to_string()))
                        .or_insert((0.0, 0.0));
                    slot.0 += week.meal_hours;
                }
            }
        }

        Ok(totals
            .into_iter()
            .map(|((employee_name, customer_name), (hours, gross))| ArchiveRecord {
                fiscal_month: month,
                employee_name,
                customer_name,
                hours: round2(hours),
                gross_pay: round2(gross),
                closed_at: now,
            })
            .collect())
    }

    /// Phase one of close-month: write the archive rows, replacing any
    /// rows a previously interrupted close left for the same month.
    pub fn write_month_archive(&mut self, month: FiscalMonthId, rows: Vec<ArchiveRecord>) {
        self.archives.retain(|r| r.fiscal_month != month);
        self.archives.extend(rows);
    }

    /// Undo of phase one, used when the archive write could not be made
    /// durable
    pub fn rollback_month_archive(&mut self, month: FiscalMonthId) {
        self.archives.retain(|r| r.fiscal_month != month);
    }

    /// Phase two of close-month: purge the month's live entries and mark
    /// the month closed. Only legal after the archive rows are durable.
    pub fn purge_month(&mut self, calendar: &PayrollCalendar, month: FiscalMonthId) -> u32 {
        let (start, end) = calendar.month_range(month);
        let ids: Vec<EntryId> = self
            .entries
            .values()
            .filter(|e| e.work_date >= start && e.work_date <= end)
            .map(|e| e.id)
            .collect();
        for id in &ids {
            if let Some(entry) = self.entries.remove(id) {
                self.entry_by_key
                    .remove(&(entry.employee_id, entry.customer_id, entry.work_date));
            }
        }
        self.closed_months.insert(month.0);
        ids.len() as u32
    }

    pub fn archives(&self) -> &[ArchiveRecord] {
        &self.archives
    }

    // Aggregation & integrity

    fn pay_line_for(&self, entry: &TimeEntry) -> LedgerResult<PayLine> {
        let customer = self
            .customers
            .get(&entry.customer_id)
            .ok_or_else(|| LedgerError::validation(format!("unknown customer id {}", entry.customer_id)))?;
        let meal = customer.is_meal();
        let bill_rate = if meal {
            0.0
        } else {
            self.resolve_bill_rate(entry.employee_id, entry.customer_id)?
        };
        Ok(PayLine {
            customer_id: customer.id,
            customer_name: customer.name.clone(),
            hours: entry.hours,
            bill_rate,
            meal,
        })
    }

    /// Resolved pay lines for one employee's payroll week
    pub fn week_pay_lines(
        &self,
        employee_id: EmployeeId,
        week_start: NaiveDate,
    ) -> LedgerResult<Vec<PayLine>> {
        self.entries_for_week(employee_id, week_start)
            .into_iter()
            .map(|entry| self.pay_line_for(entry))
            .collect()
    }

    /// Work-hour sums per (employee name, customer name) over a date
    /// range. Meal entries are excluded; they are not work.
    pub fn aggregate_hours(&self, start: NaiveDate, end: NaiveDate) -> BTreeMap<(String, String), f64> {
        let mut sums: BTreeMap<(String, String), f64> = BTreeMap::new();
        for entry in self.entries_in_range(start, end) {
            let customer = match self.customers.get(&entry.customer_id) {
                Some(c) if !c.is_meal() => c,
                _ => continue,
            };
            let employee_name = match self.employees.get(&entry.employee_id) {
                Some(e) => e.name.clone(),
                None => continue,
            };
            *sums.entry((employee_name, customer.name.clone())).or_insert(0.0) += entry.hours;
        }
        sums
    }

    /// Per-day meal hours per employee over a date range, for the
    /// reconciliation sanity check
    pub fn meal_hours_by_day(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BTreeMap<(String, NaiveDate), f64> {
        let mut sums: BTreeMap<(String, NaiveDate), f64> = BTreeMap::new();
        for entry in self.entries_in_range(start, end) {
            let is_meal = self
                .customers
                .get(&entry.customer_id)
                .map(|c| c.is_meal())
                .unwrap_or(false);
            if !is_meal {
                continue;
            }
            let employee_name = match self.employees.get(&entry.employee_id) {
                Some(e) => e.name.clone(),
                None => continue,
            };
            *sums.entry((employee_name, entry.work_date)).or_insert(0.0) += entry.hours;
        }
        sums
    }

    pub fn row_counts(&self) -> RowCounts {
        RowCounts {
            employees: self.employees.len(),
            customers: self.customers.len(),
            entries: self.entries.len(),
            rate_overrides: self.rate_overrides.len(),
            archives: self.archives.len(),
        }
    }

    /// True when the core tables a backup or restore must preserve are
    /// non-empty
    pub fn has_core_rows(&self) -> bool {
        !self.employees.is_empty() && !self.entries.is_empty()
    }

    /// Referential-integrity spot check. Empty result means the store is
    /// internally consistent.
    pub fn integrity_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen_keys: HashMap<NaturalKey, EntryId> = HashMap::new();
        for entry in self.entries.values() {
            if !self.employees.contains_key(&entry.employee_id) {
                errors.push(format!("entry {} references missing employee {}", entry.id, entry.employee_id));
            }
            if !self.customers.contains_key(&entry.customer_id) {
                errors.push(format!("entry {} references missing customer {}", entry.id, entry.customer_id));
            }
            if !entry.hours.is_finite() || entry.hours <= 0.0 {
                errors.push(format!("entry {} has non-positive hours {}", entry.id, entry.hours));
            }
            let key = (entry.employee_id, entry.customer_id, entry.work_date);
            if let Some(previous) = seen_keys.insert(key, entry.id) {
                errors.push(format!(
                    "entries {previous} and {} duplicate natural key ({}, {}, {})",
                    entry.id, entry.employee_id, entry.customer_id, entry.work_date
                ));
            }
        }
        for rate in &self.rate_overrides {
            if !self.employees.contains_key(&rate.employee_id) {
                errors.push(format!("rate override references missing employee {}", rate.employee_id));
            }
            if !self.customers.contains_key(&rate.customer_id) {
                errors.push(format!("rate override references missing customer {}", rate.customer_id));
            }
        }
        errors
    }

    // Merge-restore

    /// Merge a restored snapshot into this store: insert-if-absent by
    /// natural key (name for employees/customers, the entry tuple for
    /// time entries), so re-running a restore or racing the seed never
    /// duplicates rows. Entry conflicts keep the newer `updated_at`.
    pub fn merge_from(&mut self, incoming: DomainStore) -> MergeStats {
        let mut stats = MergeStats::default();

        // Id remap tables: same-named rows on both sides keep the local id
        let mut employee_map: HashMap<EmployeeId, EmployeeId> = HashMap::new();
        for employee in incoming.employees.values() {
            let key = normalize_name(&employee.name);
            match self.employee_by_name.get(&key) {
                Some(local_id) => {
                    employee_map.insert(employee.id, *local_id);
                }
                None => {
                    employee_map.insert(employee.id, employee.id);
                    self.employee_by_name.insert(key, employee.id);
                    for alias in &employee.aliases {
                        self.employee_by_name
                            .entry(normalize_name(alias))
                            .or_insert(employee.id);
                    }
                    self.employees.insert(employee.id, employee.clone());
                    stats.employees_added += 1;
                }
            }
        }

        let mut customer_map: HashMap<CustomerId, CustomerId> = HashMap::new();
        for customer in incoming.customers.values() {
            let key = normalize_name(&customer.name);
            match self.customer_by_name.get(&key) {
                Some(local_id) => {
                    customer_map.insert(customer.id, *local_id);
                }
                None => {
                    customer_map.insert(customer.id, customer.id);
                    self.customer_by_name.insert(key, customer.id);
                    self.customers.insert(customer.id, customer.clone());
                    stats.customers_added += 1;
                }
            }
        }

        for entry in incoming.entries.values() {
            let (employee_id, customer_id) = match (
                employee_map.get(&entry.employee_id),
                customer_map.get(&entry.customer_id),
            ) {
                (Some(e), Some(c)) => (*e, *c),
                // Orphan rows in the snapshot are dropped rather than
                // imported as dangling references
                _ => continue,
            };
            let key = (employee_id, customer_id, entry.work_date);
            match self.entry_by_key.get(&key).copied() {
                Some(existing_id) => {
                    let existing = self.entries.get_mut(&existing_id).expect("index points at live row");
                    if entry.updated_at > existing.updated_at {
                        existing.hours = entry.hours;
                        existing.notes = entry.notes.clone();
                        existing.status = entry.status;
                        existing.updated_at = entry.updated_at;
                        stats.entries_updated += 1;
                    }
                }
                None => {
                    let mut imported = entry.clone();
                    imported.employee_id = employee_id;
                    imported.customer_id = customer_id;
                    self.entry_by_key.insert(key, imported.id);
                    self.entries.insert(imported.id, imported);
                    stats.entries_added += 1;
                }
            }
        }

        for rate in &incoming.rate_overrides {
            let (employee_id, customer_id) = match (
                employee_map.get(&rate.employee_id),
                customer_map.get(&rate.customer_id),
            ) {
                (Some(e), Some(c)) => (*e, *c),
                _ => continue,
            };
            let exists = self
                .rate_overrides
                .iter()
                .any(|o| o.employee_id == employee_id && o.customer_id == customer_id);
            if !exists {
                self.rate_overrides.push(RateOverride {
                    employee_id,
                    customer_id,
                    bill_rate: rate.bill_rate,
                });
                stats.overrides_added += 1;
            }
        }

        for record in &incoming.archives {
            let exists = self.archives.iter().any(|r| {
                r.fiscal_month == record.fiscal_month
                    && r.employee_name == record.employee_name
                    && r.customer_name == record.customer_name
            });
            if !exists {
                self.archives.push(record.clone());
            }
        }
        for submission in &incoming.submissions {
            if !self.submissions.contains(submission) {
                self.submissions.push(submission.clone());
            }
        }
        self.closed_months.extend(incoming.closed_months.iter().copied());

        stats
    }
}
