//! In-memory entity store: CRUD by id plus the list/filter operations the
//! domain agents need.
//!
//! The store is an injected collaborator with no business logic of its own —
//! agents own validation and decisions, the store owns records. No indexing
//! or persistence; access is guarded by per-collection `RwLock`s so the
//! single-writer assumption of the interactive deployment can later be
//! relaxed without touching callers.

/// Domain record and status types.
pub mod records;

pub use records::*;

use opsmesh_core::{OpsmeshError, OpsmeshResult};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// The shared entity store.
#[derive(Default)]
pub struct EntityStore {
    employees: RwLock<HashMap<String, Employee>>,
    leave_requests: RwLock<HashMap<String, LeaveRequest>>,
    tickets: RwLock<HashMap<String, ItTicket>>,
    access_records: RwLock<HashMap<String, AccessRecord>>,
    licenses: RwLock<HashMap<String, SoftwareLicense>>,
    assets: RwLock<HashMap<String, ItAsset>>,
    expenses: RwLock<HashMap<String, ExpenseClaim>>,
    payroll: RwLock<Vec<PayrollRecord>>,
    budgets: RwLock<HashMap<String, Budget>>,
    reimbursements: RwLock<Vec<Reimbursement>>,
    violations: RwLock<HashMap<String, Violation>>,
    trainings: RwLock<HashMap<String, TrainingRecord>>,
    compliance_audits: RwLock<Vec<ComplianceAudit>>,
    candidates: RwLock<HashMap<String, Candidate>>,
    jobs: RwLock<HashMap<String, JobPosition>>,
}

impl EntityStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Employees ---

    /// Inserts an employee record.
    pub async fn insert_employee(&self, employee: Employee) {
        self.employees
            .write()
            .await
            .insert(employee.employee_id.clone(), employee);
    }

    /// Looks up one employee.
    pub async fn employee(&self, id: &str) -> Option<Employee> {
        self.employees.read().await.get(id).cloned()
    }

    /// Snapshot of all employees, id-ordered for deterministic iteration.
    pub async fn employees(&self) -> Vec<Employee> {
        let map = self.employees.read().await;
        let mut all: Vec<Employee> = map.values().cloned().collect();
        all.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
        all
    }

    /// Next sequential id of the form `EMP001`.
    pub async fn next_employee_id(&self) -> String {
        format!("EMP{:03}", self.employees.read().await.len() + 1)
    }

    /// Decrements one leave-balance bucket by `days`.
    ///
    /// Errors if the employee is missing or the balance is insufficient;
    /// never wraps below zero.
    pub async fn deduct_leave_balance(
        &self,
        employee_id: &str,
        leave_type: LeaveType,
        days: u32,
    ) -> OpsmeshResult<u32> {
        let mut map = self.employees.write().await;
        let emp = map
            .get_mut(employee_id)
            .ok_or_else(|| OpsmeshError::NotFound(format!("employee {employee_id}")))?;
        let balance = emp.leave_balance.entry(leave_type).or_insert(0);
        if *balance < days {
            return Err(OpsmeshError::Validation(format!(
                "insufficient {leave_type} balance: {balance} available, {days} requested"
            )));
        }
        *balance -= days;
        Ok(*balance)
    }

    // --- Leave requests ---

    /// Inserts a leave request.
    pub async fn insert_leave_request(&self, request: LeaveRequest) {
        self.leave_requests
            .write()
            .await
            .insert(request.request_id.clone(), request);
    }

    /// Looks up one leave request.
    pub async fn leave_request(&self, id: &str) -> Option<LeaveRequest> {
        self.leave_requests.read().await.get(id).cloned()
    }

    /// All leave requests, submission-ordered.
    pub async fn leave_requests(&self) -> Vec<LeaveRequest> {
        let map = self.leave_requests.read().await;
        let mut all: Vec<LeaveRequest> = map.values().cloned().collect();
        all.sort_by_key(|r| r.submitted_at);
        all
    }

    /// Returns an Approved leave for the same employee whose date range
    /// overlaps `[start, end]`, if any. Leave type is irrelevant.
    pub async fn approved_leave_conflict(
        &self,
        employee_id: &str,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> Option<LeaveRequest> {
        let map = self.leave_requests.read().await;
        map.values()
            .find(|r| {
                r.employee_id == employee_id
                    && r.status == LeaveStatus::Approved
                    && r.start_date <= end
                    && r.end_date >= start
            })
            .cloned()
    }

    // --- Tickets ---

    /// Inserts a ticket.
    pub async fn insert_ticket(&self, ticket: ItTicket) {
        self.tickets
            .write()
            .await
            .insert(ticket.ticket_id.clone(), ticket);
    }

    /// Looks up one ticket.
    pub async fn ticket(&self, id: &str) -> Option<ItTicket> {
        self.tickets.read().await.get(id).cloned()
    }

    /// Applies `f` to the ticket in place; false if absent.
    pub async fn update_ticket(&self, id: &str, f: impl FnOnce(&mut ItTicket)) -> bool {
        let mut map = self.tickets.write().await;
        match map.get_mut(id) {
            Some(t) => {
                f(t);
                true
            }
            None => false,
        }
    }

    // --- Access records ---

    /// Inserts an access record.
    pub async fn insert_access_record(&self, record: AccessRecord) {
        self.access_records
            .write()
            .await
            .insert(record.record_id.clone(), record);
    }

    /// Looks up one access record.
    pub async fn access_record(&self, id: &str) -> Option<AccessRecord> {
        self.access_records.read().await.get(id).cloned()
    }

    /// All access records for one employee, grant-ordered.
    pub async fn access_for_employee(&self, employee_id: &str) -> Vec<AccessRecord> {
        let map = self.access_records.read().await;
        let mut records: Vec<AccessRecord> = map
            .values()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.granted_at);
        records
    }

    /// Snapshot of every access record.
    pub async fn access_records(&self) -> Vec<AccessRecord> {
        let map = self.access_records.read().await;
        let mut records: Vec<AccessRecord> = map.values().cloned().collect();
        records.sort_by_key(|r| r.granted_at);
        records
    }

    /// Applies `f` to the access record in place; false if absent.
    pub async fn update_access_record(&self, id: &str, f: impl FnOnce(&mut AccessRecord)) -> bool {
        let mut map = self.access_records.write().await;
        match map.get_mut(id) {
            Some(r) => {
                f(r);
                true
            }
            None => false,
        }
    }

    // --- Licenses ---

    /// Inserts a license seat.
    pub async fn insert_license(&self, license: SoftwareLicense) {
        self.licenses
            .write()
            .await
            .insert(license.license_id.clone(), license);
    }

    /// First available seat for the given software, if any.
    pub async fn available_license(&self, software: &str) -> Option<SoftwareLicense> {
        let map = self.licenses.read().await;
        let mut seats: Vec<&SoftwareLicense> = map
            .values()
            .filter(|l| l.software == software && l.status == LicenseStatus::Available)
            .collect();
        seats.sort_by(|a, b| a.license_id.cmp(&b.license_id));
        seats.first().map(|l| (*l).clone())
    }

    /// Applies `f` to the license in place; false if absent.
    pub async fn update_license(&self, id: &str, f: impl FnOnce(&mut SoftwareLicense)) -> bool {
        let mut map = self.licenses.write().await;
        match map.get_mut(id) {
            Some(l) => {
                f(l);
                true
            }
            None => false,
        }
    }

    // --- Assets ---

    /// Inserts an asset.
    pub async fn insert_asset(&self, asset: ItAsset) {
        self.assets
            .write()
            .await
            .insert(asset.asset_id.clone(), asset);
    }

    /// Looks up one asset.
    pub async fn asset(&self, id: &str) -> Option<ItAsset> {
        self.assets.read().await.get(id).cloned()
    }

    /// Assets currently assigned to one employee.
    pub async fn assets_for_employee(&self, employee_id: &str) -> Vec<ItAsset> {
        let map = self.assets.read().await;
        let mut assets: Vec<ItAsset> = map
            .values()
            .filter(|a| a.assigned_to.as_deref() == Some(employee_id))
            .cloned()
            .collect();
        assets.sort_by(|a, b| a.asset_id.cmp(&b.asset_id));
        assets
    }

    // --- Expenses ---

    /// Inserts an expense claim.
    pub async fn insert_expense(&self, expense: ExpenseClaim) {
        self.expenses
            .write()
            .await
            .insert(expense.expense_id.clone(), expense);
    }

    /// Looks up one expense claim.
    pub async fn expense(&self, id: &str) -> Option<ExpenseClaim> {
        self.expenses.read().await.get(id).cloned()
    }

    /// Applies `f` to the expense in place; false if absent.
    pub async fn update_expense(&self, id: &str, f: impl FnOnce(&mut ExpenseClaim)) -> bool {
        let mut map = self.expenses.write().await;
        match map.get_mut(id) {
            Some(e) => {
                f(e);
                true
            }
            None => false,
        }
    }

    // --- Payroll ---

    /// Appends a payroll line.
    pub async fn insert_payroll_record(&self, record: PayrollRecord) {
        self.payroll.write().await.push(record);
    }

    /// All payroll lines for a month/year.
    pub async fn payroll_for_period(&self, month: u32, year: i32) -> Vec<PayrollRecord> {
        self.payroll
            .read()
            .await
            .iter()
            .filter(|r| r.month == month && r.year == year)
            .cloned()
            .collect()
    }

    // --- Budgets ---

    /// Inserts or replaces a department budget.
    pub async fn upsert_budget(&self, budget: Budget) {
        self.budgets
            .write()
            .await
            .insert(budget.department.clone(), budget);
    }

    /// Looks up a department budget.
    pub async fn budget(&self, department: &str) -> Option<Budget> {
        self.budgets.read().await.get(department).cloned()
    }

    /// Applies `f` to the budget in place; false if absent.
    pub async fn update_budget(&self, department: &str, f: impl FnOnce(&mut Budget)) -> bool {
        let mut map = self.budgets.write().await;
        match map.get_mut(department) {
            Some(b) => {
                f(b);
                true
            }
            None => false,
        }
    }

    // --- Reimbursements ---

    /// Appends a reimbursement.
    pub async fn insert_reimbursement(&self, reimbursement: Reimbursement) {
        self.reimbursements.write().await.push(reimbursement);
    }

    /// Snapshot of all reimbursements, processing-ordered.
    pub async fn reimbursements(&self) -> Vec<Reimbursement> {
        self.reimbursements.read().await.clone()
    }

    // --- Violations ---

    /// Inserts a violation.
    pub async fn insert_violation(&self, violation: Violation) {
        self.violations
            .write()
            .await
            .insert(violation.violation_id.clone(), violation);
    }

    /// Looks up one violation.
    pub async fn violation(&self, id: &str) -> Option<Violation> {
        self.violations.read().await.get(id).cloned()
    }

    /// Applies `f` to the violation in place; false if absent.
    pub async fn update_violation(&self, id: &str, f: impl FnOnce(&mut Violation)) -> bool {
        let mut map = self.violations.write().await;
        match map.get_mut(id) {
            Some(v) => {
                f(v);
                true
            }
            None => false,
        }
    }

    /// All violations still Open, report-ordered.
    pub async fn open_violations(&self) -> Vec<Violation> {
        let map = self.violations.read().await;
        let mut open: Vec<Violation> = map
            .values()
            .filter(|v| v.status == ViolationStatus::Open)
            .cloned()
            .collect();
        open.sort_by_key(|v| v.reported_at);
        open
    }

    /// Open violations attributed to one employee.
    pub async fn open_violations_for_employee(&self, employee_id: &str) -> Vec<Violation> {
        let map = self.violations.read().await;
        map.values()
            .filter(|v| {
                v.status == ViolationStatus::Open
                    && v.employee_id.as_deref() == Some(employee_id)
            })
            .cloned()
            .collect()
    }

    // --- Trainings ---

    /// Inserts a training record.
    pub async fn insert_training(&self, training: TrainingRecord) {
        self.trainings
            .write()
            .await
            .insert(training.training_id.clone(), training);
    }

    /// Looks up one training record.
    pub async fn training(&self, id: &str) -> Option<TrainingRecord> {
        self.trainings.read().await.get(id).cloned()
    }

    /// Applies `f` to the training in place; false if absent.
    pub async fn update_training(&self, id: &str, f: impl FnOnce(&mut TrainingRecord)) -> bool {
        let mut map = self.trainings.write().await;
        match map.get_mut(id) {
            Some(t) => {
                f(t);
                true
            }
            None => false,
        }
    }

    /// Trainings scheduled for one employee, schedule-ordered.
    pub async fn trainings_for_employee(&self, employee_id: &str) -> Vec<TrainingRecord> {
        let map = self.trainings.read().await;
        let mut records: Vec<TrainingRecord> = map
            .values()
            .filter(|t| t.employee_id == employee_id)
            .cloned()
            .collect();
        records.sort_by_key(|t| t.scheduled_at);
        records
    }

    /// Snapshot of every training record.
    pub async fn trainings(&self) -> Vec<TrainingRecord> {
        let map = self.trainings.read().await;
        let mut all: Vec<TrainingRecord> = map.values().cloned().collect();
        all.sort_by_key(|t| t.scheduled_at);
        all
    }

    // --- Compliance audits ---

    /// Appends a compliance audit result.
    pub async fn insert_compliance_audit(&self, audit: ComplianceAudit) {
        self.compliance_audits.write().await.push(audit);
    }

    /// Snapshot of past audits, run-ordered.
    pub async fn compliance_audits(&self) -> Vec<ComplianceAudit> {
        self.compliance_audits.read().await.clone()
    }

    // --- Candidates & jobs ---

    /// Inserts a candidate.
    pub async fn insert_candidate(&self, candidate: Candidate) {
        self.candidates
            .write()
            .await
            .insert(candidate.candidate_id.clone(), candidate);
    }

    /// Looks up one candidate.
    pub async fn candidate(&self, id: &str) -> Option<Candidate> {
        self.candidates.read().await.get(id).cloned()
    }

    /// Applies `f` to the candidate in place; false if absent.
    pub async fn update_candidate(&self, id: &str, f: impl FnOnce(&mut Candidate)) -> bool {
        let mut map = self.candidates.write().await;
        match map.get_mut(id) {
            Some(c) => {
                f(c);
                true
            }
            None => false,
        }
    }

    /// Inserts an open position.
    pub async fn insert_job(&self, job: JobPosition) {
        self.jobs.write().await.insert(job.job_id.clone(), job);
    }

    /// Looks up one position.
    pub async fn job(&self, id: &str) -> Option<JobPosition> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Finds a position by title (exact match).
    pub async fn job_by_title(&self, title: &str) -> Option<JobPosition> {
        let map = self.jobs.read().await;
        map.values().find(|j| j.title == title).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn employee(id: &str) -> Employee {
        Employee {
            employee_id: id.to_string(),
            name: "Alice Johnson".to_string(),
            email: "alice@example.com".to_string(),
            department: "Engineering".to_string(),
            position: "Senior Developer".to_string(),
            join_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            leave_balance: LeaveType::default_balances(),
        }
    }

    fn leave(id: &str, emp: &str, status: LeaveStatus, start: (i32, u32, u32), end: (i32, u32, u32)) -> LeaveRequest {
        LeaveRequest {
            request_id: id.to_string(),
            employee_id: emp.to_string(),
            leave_type: LeaveType::Annual,
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            days: 3,
            reason: "trip".to_string(),
            status,
            submitted_at: Utc::now(),
            processed_at: None,
        }
    }

    #[tokio::test]
    async fn employee_crud_and_sequential_ids() {
        let store = EntityStore::new();
        assert_eq!(store.next_employee_id().await, "EMP001");
        store.insert_employee(employee("EMP001")).await;
        assert_eq!(store.next_employee_id().await, "EMP002");
        assert!(store.employee("EMP001").await.is_some());
        assert!(store.employee("EMP999").await.is_none());
    }

    #[tokio::test]
    async fn deduct_leave_balance_guards() {
        let store = EntityStore::new();
        store.insert_employee(employee("EMP001")).await;

        let left = store
            .deduct_leave_balance("EMP001", LeaveType::Annual, 5)
            .await
            .unwrap();
        assert_eq!(left, 15);

        // insufficient balance is a validation error, balance untouched
        let err = store
            .deduct_leave_balance("EMP001", LeaveType::Annual, 99)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsmeshError::Validation(_)));
        let emp = store.employee("EMP001").await.unwrap();
        assert_eq!(emp.leave_balance[&LeaveType::Annual], 15);

        let err = store
            .deduct_leave_balance("EMP404", LeaveType::Sick, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsmeshError::NotFound(_)));
    }

    #[tokio::test]
    async fn approved_leave_conflict_detection() {
        let store = EntityStore::new();
        store
            .insert_leave_request(leave("LR1", "EMP001", LeaveStatus::Approved, (2026, 9, 10), (2026, 9, 14)))
            .await;
        store
            .insert_leave_request(leave("LR2", "EMP001", LeaveStatus::Rejected, (2026, 10, 1), (2026, 10, 5)))
            .await;

        // overlapping with the approved range
        let hit = store
            .approved_leave_conflict(
                "EMP001",
                NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
                NaiveDate::from_ymd_opt(2026, 9, 20).unwrap(),
            )
            .await;
        assert_eq!(hit.unwrap().request_id, "LR1");

        // rejected requests never conflict
        assert!(store
            .approved_leave_conflict(
                "EMP001",
                NaiveDate::from_ymd_opt(2026, 10, 2).unwrap(),
                NaiveDate::from_ymd_opt(2026, 10, 3).unwrap(),
            )
            .await
            .is_none());

        // other employees never conflict
        assert!(store
            .approved_leave_conflict(
                "EMP002",
                NaiveDate::from_ymd_opt(2026, 9, 10).unwrap(),
                NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
            )
            .await
            .is_none());
    }

    #[tokio::test]
    async fn update_missing_entity_is_false() {
        let store = EntityStore::new();
        assert!(!store.update_ticket("TKT404", |t| t.status = TicketStatus::Resolved).await);
        assert!(!store.update_expense("EXP404", |e| e.status = ExpenseStatus::Rejected).await);
        assert!(!store.update_violation("VIO404", |v| v.status = ViolationStatus::Resolved).await);
    }

    #[tokio::test]
    async fn available_license_is_deterministic() {
        let store = EntityStore::new();
        for (id, status) in [
            ("LIC2", LicenseStatus::Available),
            ("LIC1", LicenseStatus::Available),
            ("LIC0", LicenseStatus::InUse),
        ] {
            store
                .insert_license(SoftwareLicense {
                    license_id: id.to_string(),
                    software: "Jira".to_string(),
                    assigned_to: None,
                    status,
                })
                .await;
        }
        // lowest-id available seat wins
        assert_eq!(store.available_license("Jira").await.unwrap().license_id, "LIC1");
        assert!(store.available_license("Slack").await.is_none());
    }

    #[tokio::test]
    async fn open_violations_filters_by_status_and_employee() {
        let store = EntityStore::new();
        let base = Violation {
            violation_id: "VIO1".to_string(),
            reported_by: "SYSTEM".to_string(),
            employee_id: Some("EMP001".to_string()),
            category: "Security".to_string(),
            description: "shared password".to_string(),
            severity: Severity::High,
            status: ViolationStatus::Open,
            reported_at: Utc::now(),
            resolution: None,
            resolved_at: None,
            resolved_by: None,
        };
        store.insert_violation(base.clone()).await;
        store
            .insert_violation(Violation {
                violation_id: "VIO2".to_string(),
                status: ViolationStatus::Resolved,
                ..base.clone()
            })
            .await;

        assert_eq!(store.open_violations().await.len(), 1);
        assert_eq!(store.open_violations_for_employee("EMP001").await.len(), 1);
        assert!(store.open_violations_for_employee("EMP002").await.is_empty());
    }

    #[tokio::test]
    async fn payroll_period_filter() {
        let store = EntityStore::new();
        for (month, year) in [(9, 2026), (9, 2026), (10, 2026)] {
            store
                .insert_payroll_record(PayrollRecord {
                    record_id: format!("PAY-{month}-{year}"),
                    employee_id: "EMP001".to_string(),
                    month,
                    year,
                    base_salary: 60000.0,
                    deductions: 0.0,
                    net_salary: 60000.0,
                    status: PayrollStatus::Processed,
                    processed_at: Utc::now(),
                })
                .await;
        }
        assert_eq!(store.payroll_for_period(9, 2026).await.len(), 2);
        assert_eq!(store.payroll_for_period(10, 2026).await.len(), 1);
        assert!(store.payroll_for_period(1, 2025).await.is_empty());
    }
}
