//! Compliance agent: violation reporting, mandatory trainings, compliance
//! audits, and the exit clearance check.

use crate::{short_id, Agent, AgentContext};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use opsmesh_bus::EventHandler;
use opsmesh_core::{Event, EventType, OpsmeshError, OpsmeshResult};
use opsmesh_store::{
    ComplianceAudit, ComplianceStatus, Severity, TrainingRecord, TrainingStatus, Violation,
    ViolationStatus,
};
use serde::Serialize;

const CAPABILITIES: &[&str] = &[
    "report_violation",
    "violation_status",
    "resolve_violation",
    "schedule_training",
    "complete_training",
    "training_status",
    "run_compliance_audit",
    "exit_compliance_check",
];

/// Trainings every new hire must complete.
const MANDATORY_TRAININGS: &[&str] = &["Security Awareness", "Code of Conduct", "Data Privacy"];
/// Days a new hire gets to complete mandatory trainings.
const ONBOARDING_TRAINING_DUE_DAYS: i64 = 30;

/// Clearance summary for a departing employee.
#[derive(Debug, Clone, Serialize)]
pub struct ExitCheckReport {
    /// The departing employee.
    pub employee_id: String,
    /// Violations still open against them.
    pub open_violations: usize,
    /// Scheduled trainings they never completed.
    pub incomplete_trainings: usize,
    /// True when both counts are zero.
    pub clear: bool,
}

/// The Compliance domain agent.
pub struct ComplianceAgent {
    ctx: AgentContext,
}

impl ComplianceAgent {
    /// Routing key.
    pub const KEY: &'static str = "compliance";
    const NAME: &'static str = "Compliance Agent";

    /// Creates the agent over its injected context.
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Records a violation and announces `ViolationReported`.
    pub async fn report_violation(
        &self,
        reported_by: &str,
        employee_id: Option<&str>,
        category: &str,
        description: &str,
        severity: Severity,
    ) -> OpsmeshResult<Violation> {
        if let Some(id) = employee_id {
            self.require_employee(id).await?;
        }
        if description.trim().is_empty() {
            return Err(OpsmeshError::Validation(
                "violation description is required".to_string(),
            ));
        }

        let violation = Violation {
            violation_id: short_id("VIO"),
            reported_by: reported_by.to_string(),
            employee_id: employee_id.map(String::from),
            category: category.to_string(),
            description: description.to_string(),
            severity,
            status: ViolationStatus::Open,
            reported_at: Utc::now(),
            resolution: None,
            resolved_at: None,
            resolved_by: None,
        };
        self.ctx.store.insert_violation(violation.clone()).await;

        self.ctx
            .bus
            .publish(
                EventType::ViolationReported,
                serde_json::json!({"violation_id": violation.violation_id,
                    "severity": severity, "category": category,
                    "employee_id": employee_id}),
                Self::NAME,
            )
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Report Violation",
                serde_json::json!({"violation_id": violation.violation_id,
                    "severity": severity, "category": category}),
                employee_id.unwrap_or("System"),
            )
            .await;
        Ok(violation)
    }

    /// Current state of one violation.
    pub async fn violation_status(&self, violation_id: &str) -> OpsmeshResult<Violation> {
        self.ctx
            .store
            .violation(violation_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("violation {violation_id}")))
    }

    /// Closes an open violation with a resolution.
    pub async fn resolve_violation(
        &self,
        violation_id: &str,
        resolution: &str,
        resolved_by: &str,
    ) -> OpsmeshResult<Violation> {
        let violation = self.violation_status(violation_id).await?;
        if violation.status == ViolationStatus::Resolved {
            return Err(OpsmeshError::Validation(format!(
                "violation {violation_id} is already resolved"
            )));
        }
        self.ctx
            .store
            .update_violation(violation_id, |v| {
                v.status = ViolationStatus::Resolved;
                v.resolution = Some(resolution.to_string());
                v.resolved_at = Some(Utc::now());
                v.resolved_by = Some(resolved_by.to_string());
            })
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Resolve Violation",
                serde_json::json!({"violation_id": violation_id, "resolved_by": resolved_by}),
                violation.employee_id.as_deref().unwrap_or("System"),
            )
            .await;
        self.violation_status(violation_id).await
    }

    /// Schedules one training for an employee.
    pub async fn schedule_training(
        &self,
        employee_id: &str,
        training_type: &str,
        due_date: chrono::NaiveDate,
        mandatory: bool,
    ) -> OpsmeshResult<TrainingRecord> {
        self.require_employee(employee_id).await?;
        let record = TrainingRecord {
            training_id: short_id("TRN"),
            employee_id: employee_id.to_string(),
            training_type: training_type.to_string(),
            status: TrainingStatus::Scheduled,
            due_date,
            mandatory,
            scheduled_at: Utc::now(),
            completed_at: None,
        };
        self.ctx.store.insert_training(record.clone()).await;
        self.ctx
            .log_action(
                Self::NAME,
                "Schedule Training",
                serde_json::json!({"training_id": record.training_id,
                    "training_type": training_type, "due_date": due_date,
                    "mandatory": mandatory}),
                employee_id,
            )
            .await;
        Ok(record)
    }

    /// Marks a scheduled training completed.
    pub async fn complete_training(&self, training_id: &str) -> OpsmeshResult<TrainingRecord> {
        let record = self
            .ctx
            .store
            .training(training_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("training {training_id}")))?;
        if record.status == TrainingStatus::Completed {
            return Err(OpsmeshError::Validation(format!(
                "training {training_id} is already completed"
            )));
        }
        self.ctx
            .store
            .update_training(training_id, |t| {
                t.status = TrainingStatus::Completed;
                t.completed_at = Some(Utc::now());
            })
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Complete Training",
                serde_json::json!({"training_id": training_id}),
                &record.employee_id,
            )
            .await;
        self.ctx
            .store
            .training(training_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("training {training_id}")))
    }

    /// All trainings of one employee.
    pub async fn training_status(&self, employee_id: &str) -> OpsmeshResult<Vec<TrainingRecord>> {
        self.require_employee(employee_id).await?;
        Ok(self.ctx.store.trainings_for_employee(employee_id).await)
    }

    /// Runs a compliance audit over mandatory trainings and open
    /// violations. A mandatory training counts as a finding once it has
    /// stayed Scheduled past its due date by the configured grace period.
    pub async fn run_compliance_audit(&self, scope: &str) -> ComplianceAudit {
        let mut findings = Vec::new();

        let overdue_cutoff =
            Utc::now().date_naive() - Duration::days(self.ctx.settings.training_overdue_days);
        for training in self.ctx.store.trainings().await {
            if training.mandatory
                && training.status == TrainingStatus::Scheduled
                && training.due_date < overdue_cutoff
            {
                findings.push(format!(
                    "mandatory training {} for {} overdue since {}",
                    training.training_type, training.employee_id, training.due_date
                ));
            }
        }
        for violation in self.ctx.store.open_violations().await {
            findings.push(format!(
                "open {:?} violation {} ({})",
                violation.severity, violation.violation_id, violation.category
            ));
        }

        let audit = ComplianceAudit {
            audit_id: short_id("AUD"),
            scope: scope.to_string(),
            status: if findings.is_empty() {
                ComplianceStatus::Compliant
            } else {
                ComplianceStatus::IssuesFound
            },
            findings,
            audited_at: Utc::now(),
        };
        self.ctx.store.insert_compliance_audit(audit.clone()).await;
        self.ctx
            .log_action(
                Self::NAME,
                "Compliance Audit",
                serde_json::json!({"audit_id": audit.audit_id, "scope": scope,
                    "status": audit.status, "findings": audit.findings.len()}),
                "System",
            )
            .await;
        audit
    }

    /// Exit clearance: open violations and incomplete trainings of a
    /// departing employee.
    pub async fn exit_compliance_check(
        &self,
        employee_id: &str,
    ) -> OpsmeshResult<ExitCheckReport> {
        self.require_employee(employee_id).await?;

        let open_violations = self
            .ctx
            .store
            .open_violations_for_employee(employee_id)
            .await
            .len();
        let incomplete_trainings = self
            .ctx
            .store
            .trainings_for_employee(employee_id)
            .await
            .iter()
            .filter(|t| t.status == TrainingStatus::Scheduled)
            .count();

        let report = ExitCheckReport {
            employee_id: employee_id.to_string(),
            open_violations,
            incomplete_trainings,
            clear: open_violations == 0 && incomplete_trainings == 0,
        };
        self.ctx
            .log_action(
                Self::NAME,
                "Exit Compliance Check",
                serde_json::json!({"open_violations": open_violations,
                    "incomplete_trainings": incomplete_trainings, "clear": report.clear}),
                employee_id,
            )
            .await;
        Ok(report)
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

#[async_trait]
impl EventHandler for ComplianceAgent {
    fn handler_name(&self) -> &str {
        Self::NAME
    }

    async fn on_event(&self, event: &Event) -> OpsmeshResult<()> {
        match event.event_type {
            EventType::EmployeeOnboarded => {
                let employee_id = event.payload["employee_id"].as_str().ok_or_else(|| {
                    OpsmeshError::Bus("event payload missing employee_id".to_string())
                })?;
                let due_date =
                    Utc::now().date_naive() + Duration::days(ONBOARDING_TRAINING_DUE_DAYS);
                for training in MANDATORY_TRAININGS {
                    self.schedule_training(employee_id, training, due_date, true)
                        .await?;
                }
                Ok(())
            }
            EventType::ViolationReported => {
                let severity = event.payload["severity"].as_str().unwrap_or("");
                if matches!(severity, "High" | "Critical") {
                    self.ctx
                        .log_action(
                            Self::NAME,
                            "Urgent Violation Alert",
                            serde_json::json!({
                                "violation_id": event.payload["violation_id"],
                                "severity": severity,
                            }),
                            event.payload["employee_id"].as_str().unwrap_or("System"),
                        )
                        .await;
                }
                Ok(())
            }
            EventType::SecurityIncident => {
                let description = event.payload["description"]
                    .as_str()
                    .unwrap_or("reported security incident");
                self.report_violation(
                    &event.source,
                    None,
                    "Security",
                    description,
                    Severity::High,
                )
                .await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Agent for ComplianceAgent {
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
        &[
            EventType::EmployeeOnboarded,
            EventType::ViolationReported,
            EventType::SecurityIncident,
        ]
    }

    fn ctx(&self) -> &AgentContext {
        &self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_context;
    use chrono::NaiveDate;
    use opsmesh_store::{Employee, LeaveType};

    fn agent() -> ComplianceAgent {
        ComplianceAgent::new(test_context("compliance"))
    }

    async fn seed_employee(comp: &ComplianceAgent, id: &str) {
        comp.ctx
            .store
            .insert_employee(Employee {
                employee_id: id.to_string(),
                name: "Alice Johnson".to_string(),
                email: "alice@example.com".to_string(),
                department: "Engineering".to_string(),
                position: "Developer".to_string(),
                join_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                leave_balance: LeaveType::default_balances(),
            })
            .await;
    }

    #[tokio::test]
    async fn violation_lifecycle() {
        let comp = agent();
        seed_employee(&comp, "EMP001").await;

        let violation = comp
            .report_violation("EMP002", Some("EMP001"), "Security", "shared password", Severity::High)
            .await
            .unwrap();
        assert_eq!(violation.status, ViolationStatus::Open);

        let log = comp.ctx.bus.event_log(10).await;
        assert_eq!(log[0].event_type, EventType::ViolationReported);

        let resolved = comp
            .resolve_violation(&violation.violation_id, "password rotated", "EMP003")
            .await
            .unwrap();
        assert_eq!(resolved.status, ViolationStatus::Resolved);
        assert_eq!(resolved.resolved_by.as_deref(), Some("EMP003"));

        assert!(matches!(
            comp.resolve_violation(&violation.violation_id, "again", "EMP003")
                .await
                .unwrap_err(),
            OpsmeshError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn violation_against_unknown_employee_is_rejected() {
        let comp = agent();
        let err = comp
            .report_violation("EMP002", Some("EMP404"), "Security", "x", Severity::Low)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsmeshError::NotFound(_)));
        assert!(comp.ctx.bus.event_log(10).await.is_empty());

        // anonymous violations need no employee
        assert!(comp
            .report_violation("hotline", None, "Ethics", "anonymous tip", Severity::Medium)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn training_lifecycle() {
        let comp = agent();
        seed_employee(&comp, "EMP001").await;
        let due = NaiveDate::from_ymd_opt(2026, 10, 1).unwrap();

        let record = comp
            .schedule_training("EMP001", "Security Awareness", due, true)
            .await
            .unwrap();
        assert_eq!(record.status, TrainingStatus::Scheduled);

        let completed = comp.complete_training(&record.training_id).await.unwrap();
        assert_eq!(completed.status, TrainingStatus::Completed);
        assert!(completed.completed_at.is_some());

        assert!(matches!(
            comp.complete_training(&record.training_id).await.unwrap_err(),
            OpsmeshError::Validation(_)
        ));

        let all = comp.training_status("EMP001").await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn audit_is_compliant_when_clean() {
        let comp = agent();
        let audit = comp.run_compliance_audit("quarterly").await;
        assert_eq!(audit.status, ComplianceStatus::Compliant);
        assert!(audit.findings.is_empty());
        assert_eq!(comp.ctx.store.compliance_audits().await.len(), 1);
    }

    #[tokio::test]
    async fn audit_flags_overdue_trainings_and_open_violations() {
        let comp = agent();
        seed_employee(&comp, "EMP001").await;

        // overdue well past the 30-day grace
        let long_overdue = Utc::now().date_naive() - Duration::days(40);
        comp.schedule_training("EMP001", "Data Privacy", long_overdue, true)
            .await
            .unwrap();
        // past due but inside the grace period: not a finding
        let recently_due = Utc::now().date_naive() - Duration::days(10);
        comp.schedule_training("EMP001", "Code of Conduct", recently_due, true)
            .await
            .unwrap();
        comp.report_violation("EMP002", Some("EMP001"), "Security", "tailgating", Severity::Medium)
            .await
            .unwrap();

        let audit = comp.run_compliance_audit("quarterly").await;
        assert_eq!(audit.status, ComplianceStatus::IssuesFound);
        assert_eq!(audit.findings.len(), 2);
        assert!(audit.findings.iter().any(|f| f.contains("Data Privacy")));
        assert!(audit.findings.iter().any(|f| f.contains("violation")));
    }

    #[tokio::test]
    async fn exit_check_counts_open_items() {
        let comp = agent();
        seed_employee(&comp, "EMP001").await;

        let report = comp.exit_compliance_check("EMP001").await.unwrap();
        assert!(report.clear);

        comp.report_violation("EMP002", Some("EMP001"), "Security", "x", Severity::Low)
            .await
            .unwrap();
        comp.schedule_training(
            "EMP001",
            "Security Awareness",
            NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            true,
        )
        .await
        .unwrap();

        let report = comp.exit_compliance_check("EMP001").await.unwrap();
        assert_eq!(report.open_violations, 1);
        assert_eq!(report.incomplete_trainings, 1);
        assert!(!report.clear);
    }

    #[tokio::test]
    async fn onboarded_event_schedules_mandatory_trainings() {
        let comp = agent();
        seed_employee(&comp, "EMP001").await;

        let event = Event::new(
            EventType::EmployeeOnboarded,
            serde_json::json!({"employee_id": "EMP001"}),
            "HR Agent",
        );
        comp.on_event(&event).await.unwrap();

        let trainings = comp.ctx.store.trainings_for_employee("EMP001").await;
        assert_eq!(trainings.len(), 3);
        assert!(trainings.iter().all(|t| t.mandatory));
        let expected_due = Utc::now().date_naive() + Duration::days(30);
        assert!(trainings.iter().all(|t| t.due_date == expected_due));
    }

    #[tokio::test]
    async fn high_severity_violation_raises_urgent_alert() {
        let comp = agent();
        let event = Event::new(
            EventType::ViolationReported,
            serde_json::json!({"violation_id": "VIO-1", "severity": "Critical"}),
            "Compliance Agent",
        );
        comp.on_event(&event).await.unwrap();
        let audit = comp.ctx.audit.list(None, None).await;
        assert!(audit.iter().any(|e| e.action == "Urgent Violation Alert"));

        // low severity: no alert
        let event = Event::new(
            EventType::ViolationReported,
            serde_json::json!({"violation_id": "VIO-2", "severity": "Low"}),
            "Compliance Agent",
        );
        comp.on_event(&event).await.unwrap();
        assert_eq!(comp.ctx.audit.len().await, 1);
    }

    #[tokio::test]
    async fn security_incident_becomes_high_violation() {
        let comp = agent();
        let event = Event::new(
            EventType::SecurityIncident,
            serde_json::json!({"description": "credential leak detected"}),
            "IT Agent",
        );
        comp.on_event(&event).await.unwrap();

        let open = comp.ctx.store.open_violations().await;
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].severity, Severity::High);
        assert_eq!(open[0].reported_by, "IT Agent");
        // the violation announcement itself went on the bus
        let log = comp.ctx.bus.event_log(10).await;
        assert_eq!(log[0].event_type, EventType::ViolationReported);
    }
}
