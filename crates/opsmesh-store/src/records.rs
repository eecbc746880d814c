//! Domain record types held by the entity store.
//!
//! Statuses are closed enums rather than free-form strings so illegal states
//! are unrepresentable and dashboards can match exhaustively.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Leave categories with per-category balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaveType {
    /// Short-notice personal leave.
    Casual,
    /// Illness.
    Sick,
    /// Planned vacation.
    Annual,
}

impl LeaveType {
    /// Default opening balances for a new employee: 12 casual, 15 sick,
    /// 20 annual days.
    pub fn default_balances() -> HashMap<LeaveType, u32> {
        HashMap::from([
            (LeaveType::Casual, 12),
            (LeaveType::Sick, 15),
            (LeaveType::Annual, 20),
        ])
    }
}

impl std::fmt::Display for LeaveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaveType::Casual => write!(f, "Casual Leave"),
            LeaveType::Sick => write!(f, "Sick Leave"),
            LeaveType::Annual => write!(f, "Annual Leave"),
        }
    }
}

/// An employee profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    /// Identifier of the form `EMP001`.
    pub employee_id: String,
    /// Full name.
    pub name: String,
    /// Work email.
    pub email: String,
    /// Department name.
    pub department: String,
    /// Job title.
    pub position: String,
    /// First day of employment.
    pub join_date: NaiveDate,
    /// Remaining leave days per category.
    pub leave_balance: HashMap<LeaveType, u32>,
}

/// Terminal-or-pending decision on a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveStatus {
    /// Auto-approved; balance already decremented.
    Approved,
    /// Awaiting manager approval; balance untouched.
    Pending,
    /// Refused; balance untouched.
    Rejected,
}

/// A leave request and its decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub request_id: String,
    pub employee_id: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inclusive day count of the range.
    pub days: u32,
    pub reason: String,
    pub status: LeaveStatus,
    pub submitted_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// IT ticket lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    Resolved,
}

/// Ticket urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// An IT support ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItTicket {
    pub ticket_id: String,
    pub employee_id: String,
    pub category: String,
    pub description: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub resolution: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

/// Whether a system access grant is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessStatus {
    Active,
    Revoked,
}

/// A grant of access to one system for one employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRecord {
    pub record_id: String,
    pub employee_id: String,
    pub system: String,
    pub access_level: String,
    pub status: AccessStatus,
    pub granted_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub approved_by: String,
}

/// License pool state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LicenseStatus {
    Available,
    InUse,
}

/// One seat of a software license.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftwareLicense {
    pub license_id: String,
    pub software: String,
    pub assigned_to: Option<String>,
    pub status: LicenseStatus,
}

/// Hardware asset state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetStatus {
    InStock,
    Assigned,
    Retired,
}

/// A tracked hardware asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItAsset {
    pub asset_id: String,
    pub asset_type: String,
    pub assigned_to: Option<String>,
    pub status: AssetStatus,
}

/// Approval state of an expense claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseStatus {
    Approved,
    Pending,
    Rejected,
}

/// An expense claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseClaim {
    pub expense_id: String,
    pub employee_id: String,
    pub category: String,
    pub amount: f64,
    pub description: String,
    pub status: ExpenseStatus,
    pub submitted_at: DateTime<Utc>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Regular monthly run vs. final settlement on exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayrollStatus {
    Processed,
    Final,
}

/// One employee-month payroll line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub record_id: String,
    pub employee_id: String,
    /// 1-12.
    pub month: u32,
    pub year: i32,
    pub base_salary: f64,
    pub deductions: f64,
    pub net_salary: f64,
    pub status: PayrollStatus,
    pub processed_at: DateTime<Utc>,
}

/// A department budget for one fiscal year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub budget_id: String,
    pub department: String,
    pub allocated: f64,
    pub spent: f64,
    pub fiscal_year: i32,
}

impl Budget {
    /// Unspent remainder.
    pub fn remaining(&self) -> f64 {
        self.allocated - self.spent
    }

    /// Spent share in percent; 0 for an unallocated budget.
    pub fn utilization_percent(&self) -> f64 {
        if self.allocated <= 0.0 {
            0.0
        } else {
            self.spent / self.allocated * 100.0
        }
    }
}

/// A payout against a previously approved expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reimbursement {
    pub reimbursement_id: String,
    pub expense_id: String,
    pub employee_id: String,
    pub amount: f64,
    pub processed_at: DateTime<Utc>,
}

/// Violation severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Violation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationStatus {
    Open,
    Resolved,
}

/// A reported compliance violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub violation_id: String,
    pub reported_by: String,
    pub employee_id: Option<String>,
    pub category: String,
    pub description: String,
    pub severity: Severity,
    pub status: ViolationStatus,
    pub reported_at: DateTime<Utc>,
    pub resolution: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}

/// Training lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingStatus {
    Scheduled,
    Completed,
}

/// One scheduled training for one employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub training_id: String,
    pub employee_id: String,
    pub training_type: String,
    pub status: TrainingStatus,
    pub due_date: NaiveDate,
    pub mandatory: bool,
    pub scheduled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Outcome of a compliance audit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceStatus {
    Compliant,
    IssuesFound,
}

/// A stored compliance audit with its findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceAudit {
    pub audit_id: String,
    pub scope: String,
    pub findings: Vec<String>,
    pub status: ComplianceStatus,
    pub audited_at: DateTime<Utc>,
}

/// Evaluation state of a job candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateStatus {
    Applied,
    Accepted,
    PendingReview,
    Rejected,
}

/// A job applicant and their parsed profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: String,
    pub name: String,
    pub email: String,
    pub applied_position: String,
    pub extracted_skills: Vec<String>,
    pub experience_years: u32,
    pub education: String,
    pub status: CandidateStatus,
}

/// An open position and its requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosition {
    pub job_id: String,
    pub title: String,
    pub required_skills: Vec<String>,
    pub min_experience: u32,
    pub min_education: String,
}
