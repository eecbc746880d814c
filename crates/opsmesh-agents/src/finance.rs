//! Finance agent: expense claims, payroll runs, department budgets, and
//! reimbursements.

use crate::{short_id, Agent, AgentContext};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use opsmesh_bus::EventHandler;
use opsmesh_core::{Event, EventType, OpsmeshError, OpsmeshResult};
use opsmesh_store::{
    Budget, ExpenseClaim, ExpenseStatus, PayrollRecord, PayrollStatus, Reimbursement,
};
use serde::Serialize;
use tracing::warn;

const CAPABILITIES: &[&str] = &[
    "submit_expense",
    "approve_expense",
    "expense_status",
    "process_payroll",
    "payroll_summary",
    "allocate_budget",
    "budget_status",
    "record_budget_spend",
    "issue_reimbursement",
    "settle_final_pay",
];

/// Payroll tax and benefits deduction rate.
const DEDUCTION_RATE: f64 = 0.2;

/// Outcome of one expense submission.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseReport {
    /// Stored claim id.
    pub expense_id: String,
    /// Approved (within the auto-approval limit) or Pending.
    pub status: ExpenseStatus,
    /// Human-readable explanation.
    pub message: String,
}

/// Result of one monthly payroll run.
#[derive(Debug, Clone, Serialize)]
pub struct PayrollRunReport {
    /// Payroll month, 1-12.
    pub month: u32,
    /// Payroll year.
    pub year: i32,
    /// Employees paid in this run.
    pub employees_paid: usize,
    /// Sum of net salaries.
    pub total_net: f64,
}

/// Aggregate over stored payroll lines for one period.
#[derive(Debug, Clone, Serialize)]
pub struct PayrollSummary {
    /// Month, 1-12.
    pub month: u32,
    /// Year.
    pub year: i32,
    /// Payroll lines in the period.
    pub records: usize,
    /// Sum of net salaries.
    pub total_net: f64,
}

/// Budget position of one department.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetReport {
    /// Department name.
    pub department: String,
    /// Allocated amount.
    pub allocated: f64,
    /// Spent so far.
    pub spent: f64,
    /// Unspent remainder.
    pub remaining: f64,
    /// Spent share in percent.
    pub utilization_percent: f64,
    /// True once utilization reached the alert threshold.
    pub alert: bool,
}

/// The Finance domain agent.
pub struct FinanceAgent {
    ctx: AgentContext,
}

impl FinanceAgent {
    /// Routing key.
    pub const KEY: &'static str = "finance";
    const NAME: &'static str = "Finance Agent";

    /// Creates the agent over its injected context.
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Records an expense claim. Amounts at or below the auto-approval
    /// limit are approved immediately; anything larger goes to Pending.
    /// Publishes `ExpenseSubmitted` either way.
    pub async fn submit_expense(
        &self,
        employee_id: &str,
        category: &str,
        amount: f64,
        description: &str,
    ) -> OpsmeshResult<ExpenseReport> {
        self.require_employee(employee_id).await?;
        if amount <= 0.0 {
            return Err(OpsmeshError::Validation(format!(
                "expense amount must be positive, got {amount}"
            )));
        }

        let limit = self.ctx.settings.expense_auto_approve_limit;
        let auto_approved = amount <= limit;
        let (status, approved_by, approved_at, message) = if auto_approved {
            (
                ExpenseStatus::Approved,
                Some("SYSTEM".to_string()),
                Some(Utc::now()),
                format!("auto-approved; within the {limit} limit"),
            )
        } else {
            (
                ExpenseStatus::Pending,
                None,
                None,
                format!("exceeds the {limit} auto-approval limit; awaiting manual approval"),
            )
        };

        let claim = ExpenseClaim {
            expense_id: short_id("EXP"),
            employee_id: employee_id.to_string(),
            category: category.to_string(),
            amount,
            description: description.to_string(),
            status,
            submitted_at: Utc::now(),
            approved_by,
            approved_at,
            notes: None,
        };
        let expense_id = claim.expense_id.clone();
        self.ctx.store.insert_expense(claim).await;

        self.ctx
            .bus
            .publish(
                EventType::ExpenseSubmitted,
                serde_json::json!({"expense_id": expense_id, "employee_id": employee_id,
                    "amount": amount, "status": status}),
                Self::NAME,
            )
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Submit Expense",
                serde_json::json!({"expense_id": expense_id, "amount": amount, "status": status}),
                employee_id,
            )
            .await;

        Ok(ExpenseReport {
            expense_id,
            status,
            message,
        })
    }

    /// Manually approves a pending expense.
    pub async fn approve_expense(
        &self,
        expense_id: &str,
        approver: &str,
    ) -> OpsmeshResult<ExpenseClaim> {
        let claim = self
            .ctx
            .store
            .expense(expense_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("expense {expense_id}")))?;
        if claim.status != ExpenseStatus::Pending {
            return Err(OpsmeshError::Validation(format!(
                "expense {expense_id} is not pending"
            )));
        }
        self.ctx
            .store
            .update_expense(expense_id, |e| {
                e.status = ExpenseStatus::Approved;
                e.approved_by = Some(approver.to_string());
                e.approved_at = Some(Utc::now());
            })
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Approve Expense",
                serde_json::json!({"expense_id": expense_id, "approver": approver}),
                &claim.employee_id,
            )
            .await;
        self.ctx
            .store
            .expense(expense_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("expense {expense_id}")))
    }

    /// Current state of one expense claim.
    pub async fn expense_status(&self, expense_id: &str) -> OpsmeshResult<ExpenseClaim> {
        self.ctx
            .store
            .expense(expense_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("expense {expense_id}")))
    }

    /// Runs payroll for every employee: position-based monthly pay minus a
    /// flat deduction rate. Publishes `PayrollProcessed`.
    pub async fn process_payroll(&self, month: u32, year: i32) -> OpsmeshResult<PayrollRunReport> {
        if !(1..=12).contains(&month) {
            return Err(OpsmeshError::Validation(format!("invalid month {month}")));
        }

        let employees = self.ctx.store.employees().await;
        let mut total_net = 0.0;
        for employee in &employees {
            let base_salary = monthly_base_pay(&employee.position);
            let deductions = base_salary * DEDUCTION_RATE;
            let net_salary = base_salary - deductions;
            total_net += net_salary;
            self.ctx
                .store
                .insert_payroll_record(PayrollRecord {
                    record_id: short_id("PAY"),
                    employee_id: employee.employee_id.clone(),
                    month,
                    year,
                    base_salary,
                    deductions,
                    net_salary,
                    status: PayrollStatus::Processed,
                    processed_at: Utc::now(),
                })
                .await;
        }

        self.ctx
            .bus
            .publish(
                EventType::PayrollProcessed,
                serde_json::json!({"month": month, "year": year,
                    "employees_paid": employees.len(), "total_net": total_net}),
                Self::NAME,
            )
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Process Payroll",
                serde_json::json!({"month": month, "year": year,
                    "employees_paid": employees.len()}),
                "System",
            )
            .await;

        Ok(PayrollRunReport {
            month,
            year,
            employees_paid: employees.len(),
            total_net,
        })
    }

    /// Aggregates stored payroll lines for one period.
    pub async fn payroll_summary(&self, month: u32, year: i32) -> PayrollSummary {
        let records = self.ctx.store.payroll_for_period(month, year).await;
        PayrollSummary {
            month,
            year,
            records: records.len(),
            total_net: records.iter().map(|r| r.net_salary).sum(),
        }
    }

    /// Allocates (or re-allocates) a department budget for a fiscal year.
    pub async fn allocate_budget(
        &self,
        department: &str,
        amount: f64,
        fiscal_year: i32,
    ) -> OpsmeshResult<Budget> {
        if amount <= 0.0 {
            return Err(OpsmeshError::Validation(format!(
                "budget allocation must be positive, got {amount}"
            )));
        }
        let budget = Budget {
            budget_id: short_id("BUD"),
            department: department.to_string(),
            allocated: amount,
            spent: 0.0,
            fiscal_year,
        };
        self.ctx.store.upsert_budget(budget.clone()).await;
        self.ctx
            .log_action(
                Self::NAME,
                "Allocate Budget",
                serde_json::json!({"department": department, "amount": amount,
                    "fiscal_year": fiscal_year}),
                "System",
            )
            .await;
        Ok(budget)
    }

    /// Current budget position of one department.
    pub async fn budget_status(&self, department: &str) -> OpsmeshResult<BudgetReport> {
        let budget = self
            .ctx
            .store
            .budget(department)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("budget for {department}")))?;
        Ok(self.report_for(&budget))
    }

    /// Records spend against a department budget, alerting once utilization
    /// crosses the configured threshold.
    pub async fn record_budget_spend(
        &self,
        department: &str,
        amount: f64,
    ) -> OpsmeshResult<BudgetReport> {
        if amount <= 0.0 {
            return Err(OpsmeshError::Validation(format!(
                "spend amount must be positive, got {amount}"
            )));
        }
        let updated = self
            .ctx
            .store
            .update_budget(department, |b| b.spent += amount)
            .await;
        if !updated {
            return Err(OpsmeshError::NotFound(format!("budget for {department}")));
        }
        let budget = self
            .ctx
            .store
            .budget(department)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("budget for {department}")))?;
        let report = self.report_for(&budget);

        if report.alert {
            warn!(
                department,
                utilization = report.utilization_percent,
                "budget utilization above alert threshold"
            );
            self.ctx
                .log_action(
                    Self::NAME,
                    "Budget Alert",
                    serde_json::json!({"department": department,
                        "utilization_percent": report.utilization_percent}),
                    "System",
                )
                .await;
        }
        self.ctx
            .log_action(
                Self::NAME,
                "Record Budget Spend",
                serde_json::json!({"department": department, "amount": amount}),
                "System",
            )
            .await;
        Ok(report)
    }

    /// Pays out a previously approved expense.
    pub async fn issue_reimbursement(&self, expense_id: &str) -> OpsmeshResult<Reimbursement> {
        let claim = self
            .ctx
            .store
            .expense(expense_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("expense {expense_id}")))?;
        if claim.status != ExpenseStatus::Approved {
            return Err(OpsmeshError::Validation(format!(
                "expense {expense_id} is not approved; cannot reimburse"
            )));
        }
        let reimbursement = Reimbursement {
            reimbursement_id: short_id("REI"),
            expense_id: expense_id.to_string(),
            employee_id: claim.employee_id.clone(),
            amount: claim.amount,
            processed_at: Utc::now(),
        };
        self.ctx.store.insert_reimbursement(reimbursement.clone()).await;
        self.ctx
            .log_action(
                Self::NAME,
                "Issue Reimbursement",
                serde_json::json!({"reimbursement_id": reimbursement.reimbursement_id,
                    "expense_id": expense_id, "amount": claim.amount}),
                &claim.employee_id,
            )
            .await;
        Ok(reimbursement)
    }

    /// Final settlement for a departing employee, recorded with Final
    /// status for the current period.
    pub async fn settle_final_pay(&self, employee_id: &str) -> OpsmeshResult<PayrollRecord> {
        let employee = self
            .ctx
            .store
            .employee(employee_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("employee {employee_id}")))?;

        let now = Utc::now();
        let base_salary = monthly_base_pay(&employee.position);
        let deductions = base_salary * DEDUCTION_RATE;
        let record = PayrollRecord {
            record_id: short_id("PAY"),
            employee_id: employee_id.to_string(),
            month: now.month(),
            year: now.year(),
            base_salary,
            deductions,
            net_salary: base_salary - deductions,
            status: PayrollStatus::Final,
            processed_at: now,
        };
        self.ctx.store.insert_payroll_record(record.clone()).await;

        self.ctx
            .bus
            .publish(
                EventType::PayrollProcessed,
                serde_json::json!({"employee_id": employee_id, "final": true,
                    "net": record.net_salary}),
                Self::NAME,
            )
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Settle Final Pay",
                serde_json::json!({"employee_id": employee_id, "net": record.net_salary}),
                employee_id,
            )
            .await;
        Ok(record)
    }

    fn report_for(&self, budget: &Budget) -> BudgetReport {
        let utilization_percent = budget.utilization_percent();
        BudgetReport {
            department: budget.department.clone(),
            allocated: budget.allocated,
            spent: budget.spent,
            remaining: budget.remaining(),
            utilization_percent,
            alert: utilization_percent >= self.ctx.settings.budget_alert_threshold_percent,
        }
    }

    async fn require_employee(&self, employee_id: &str) -> OpsmeshResult<()> {
        self.ctx
            .store
            .employee(employee_id)
            .await
            .map(|_| ())
            .ok_or_else(|| OpsmeshError::NotFound(format!("employee {employee_id}")))
    }
}

/// Monthly base pay by position keyword; unknown titles get the default.
fn monthly_base_pay(position: &str) -> f64 {
    let p = position.to_lowercase();
    if p.contains("manager") {
        9000.0
    } else if p.contains("senior") {
        8500.0
    } else if p.contains("developer") || p.contains("engineer") {
        7000.0
    } else if p.contains("analyst") {
        6500.0
    } else {
        6000.0
    }
}

#[async_trait]
impl EventHandler for FinanceAgent {
    fn handler_name(&self) -> &str {
        Self::NAME
    }

    async fn on_event(&self, event: &Event) -> OpsmeshResult<()> {
        match event.event_type {
            EventType::EmployeeOnboarded => {
                let employee_id = event.payload["employee_id"]
                    .as_str()
                    .ok_or_else(|| OpsmeshError::Bus("event payload missing employee_id".to_string()))?;
                self.ctx
                    .log_action(
                        Self::NAME,
                        "Payroll Setup",
                        serde_json::json!({"employee_id": employee_id}),
                        employee_id,
                    )
                    .await;
                Ok(())
            }
            EventType::ExpenseSubmitted => {
                let amount = event.payload["amount"].as_f64().unwrap_or(0.0);
                if amount > self.ctx.settings.expense_auto_approve_limit {
                    self.ctx
                        .log_action(
                            Self::NAME,
                            "Expense Review Flag",
                            serde_json::json!({
                                "expense_id": event.payload["expense_id"],
                                "amount": amount,
                            }),
                            event.payload["employee_id"].as_str().unwrap_or("System"),
                        )
                        .await;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Agent for FinanceAgent {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> &'static [&'static str] {
        CAPABILITIES
    }

    fn subscriptions(&self) -> &'static [EventType] {
        &[EventType::EmployeeOnboarded, EventType::ExpenseSubmitted]
    }

    fn ctx(&self) -> &AgentContext {
        &self.ctx
    }
}
