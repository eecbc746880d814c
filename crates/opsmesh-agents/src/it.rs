//! IT agent: support tickets, system access, license seats, hardware
//! assets, and the orphaned-access security scan.

use crate::{short_id, Agent, AgentContext};
use async_trait::async_trait;
use chrono::Utc;
use opsmesh_bus::EventHandler;
use opsmesh_core::{Event, EventType, OpsmeshError, OpsmeshResult};
use opsmesh_store::{
    AccessRecord, AccessStatus, AssetStatus, ItAsset, ItTicket, LicenseStatus, SoftwareLicense,
    TicketPriority, TicketStatus,
};
use serde::Serialize;

/// Systems every new hire is provisioned on.
const PROVISIONED_SYSTEMS: &[&str] = &["Email", "VPN", "Jira", "Slack"];

const CAPABILITIES: &[&str] = &[
    "create_ticket",
    "resolve_ticket",
    "ticket_status",
    "grant_access",
    "revoke_access",
    "revoke_all_access",
    "assign_license",
    "track_asset",
    "run_security_scan",
];

/// A freshly created ticket with the suggested first remediation step.
#[derive(Debug, Clone, Serialize)]
pub struct TicketReport {
    /// The stored ticket id.
    pub ticket_id: String,
    /// Priority as recorded.
    pub priority: TicketPriority,
    /// LLM-suggested (or rule-based) remediation step.
    pub suggestion: String,
}

/// Result of the orphaned-access scan.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityScanReport {
    /// Active access grants examined.
    pub active_grants: usize,
    /// Active grants whose employee no longer exists.
    pub orphaned_access: Vec<AccessRecord>,
    /// Human-readable findings, one per orphan.
    pub findings: Vec<String>,
}

/// The IT domain agent.
pub struct ItAgent {
    ctx: AgentContext,
}

impl ItAgent {
    /// Routing key.
    pub const KEY: &'static str = "it";
    const NAME: &'static str = "IT Agent";

    /// Creates the agent over its injected context.
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Opens a ticket for an existing employee, attaches a suggested
    /// remediation, and announces `TicketCreated`.
    pub async fn create_ticket(
        &self,
        employee_id: &str,
        category: &str,
        description: &str,
        priority: TicketPriority,
    ) -> OpsmeshResult<TicketReport> {
        self.require_employee(employee_id).await?;
        if description.trim().is_empty() {
            return Err(OpsmeshError::Validation(
                "ticket description is required".to_string(),
            ));
        }
        Ok(self.open_ticket(employee_id, category, description, priority).await)
    }

    /// Marks a ticket resolved and announces `TicketResolved`.
    pub async fn resolve_ticket(
        &self,
        ticket_id: &str,
        resolution: &str,
        resolved_by: &str,
    ) -> OpsmeshResult<ItTicket> {
        let ticket = self
            .ctx
            .store
            .ticket(ticket_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("ticket {ticket_id}")))?;
        if ticket.status == TicketStatus::Resolved {
            return Err(OpsmeshError::Validation(format!(
                "ticket {ticket_id} is already resolved"
            )));
        }

        self.ctx
            .store
            .update_ticket(ticket_id, |t| {
                t.status = TicketStatus::Resolved;
                t.resolution = Some(resolution.to_string());
                t.resolved_at = Some(Utc::now());
                t.resolved_by = Some(resolved_by.to_string());
            })
            .await;

        self.ctx
            .bus
            .publish(
                EventType::TicketResolved,
                serde_json::json!({"ticket_id": ticket_id, "resolved_by": resolved_by}),
                Self::NAME,
            )
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Resolve Ticket",
                serde_json::json!({"ticket_id": ticket_id, "resolution": resolution}),
                &ticket.employee_id,
            )
            .await;

        self.ctx
            .store
            .ticket(ticket_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("ticket {ticket_id}")))
    }

    /// Current state of one ticket.
    pub async fn ticket_status(&self, ticket_id: &str) -> OpsmeshResult<ItTicket> {
        self.ctx
            .store
            .ticket(ticket_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("ticket {ticket_id}")))
    }

    /// Grants one employee access to one system.
    pub async fn grant_access(
        &self,
        employee_id: &str,
        system: &str,
        access_level: &str,
        approved_by: &str,
    ) -> OpsmeshResult<AccessRecord> {
        self.require_employee(employee_id).await?;
        let record = AccessRecord {
            record_id: short_id("ACC"),
            employee_id: employee_id.to_string(),
            system: system.to_string(),
            access_level: access_level.to_string(),
            status: AccessStatus::Active,
            granted_at: Utc::now(),
            revoked_at: None,
            approved_by: approved_by.to_string(),
        };
        self.ctx.store.insert_access_record(record.clone()).await;
        self.ctx
            .log_action(
                Self::NAME,
                "Grant Access",
                serde_json::json!({"record_id": record.record_id, "system": system,
                    "access_level": access_level}),
                employee_id,
            )
            .await;
        Ok(record)
    }

    /// Revokes one access grant.
    pub async fn revoke_access(&self, record_id: &str) -> OpsmeshResult<AccessRecord> {
        let record = self
            .ctx
            .store
            .access_record(record_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("access record {record_id}")))?;
        if record.status == AccessStatus::Revoked {
            return Err(OpsmeshError::Validation(format!(
                "access record {record_id} is already revoked"
            )));
        }
        self.ctx
            .store
            .update_access_record(record_id, |r| {
                r.status = AccessStatus::Revoked;
                r.revoked_at = Some(Utc::now());
            })
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Revoke Access",
                serde_json::json!({"record_id": record_id, "system": record.system}),
                &record.employee_id,
            )
            .await;
        self.ctx
            .store
            .access_record(record_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("access record {record_id}")))
    }

    /// Revokes every active grant of one employee; returns how many were
    /// revoked. Already-revoked grants are skipped, so the operation is safe
    /// to repeat.
    pub async fn revoke_all_access(&self, employee_id: &str) -> OpsmeshResult<usize> {
        self.require_employee(employee_id).await?;
        let mut revoked = 0;
        for record in self.ctx.store.access_for_employee(employee_id).await {
            if record.status == AccessStatus::Active {
                self.ctx
                    .store
                    .update_access_record(&record.record_id, |r| {
                        r.status = AccessStatus::Revoked;
                        r.revoked_at = Some(Utc::now());
                    })
                    .await;
                revoked += 1;
            }
        }
        self.ctx
            .log_action(
                Self::NAME,
                "Revoke All Access",
                serde_json::json!({"revoked": revoked}),
                employee_id,
            )
            .await;
        Ok(revoked)
    }

    /// Assigns an available seat of the given software to an employee.
    pub async fn assign_license(
        &self,
        employee_id: &str,
        software: &str,
    ) -> OpsmeshResult<SoftwareLicense> {
        self.require_employee(employee_id).await?;
        let seat = self
            .ctx
            .store
            .available_license(software)
            .await
            .ok_or_else(|| {
                OpsmeshError::NotFound(format!("no available {software} license seat"))
            })?;
        self.ctx
            .store
            .update_license(&seat.license_id, |l| {
                l.status = LicenseStatus::InUse;
                l.assigned_to = Some(employee_id.to_string());
            })
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Assign License",
                serde_json::json!({"license_id": seat.license_id, "software": software}),
                employee_id,
            )
            .await;
        Ok(SoftwareLicense {
            status: LicenseStatus::InUse,
            assigned_to: Some(employee_id.to_string()),
            ..seat
        })
    }

    /// Registers a hardware asset, optionally assigned to an employee.
    pub async fn track_asset(
        &self,
        asset_type: &str,
        assigned_to: Option<&str>,
    ) -> OpsmeshResult<ItAsset> {
        if let Some(employee_id) = assigned_to {
            self.require_employee(employee_id).await?;
        }
        let asset = ItAsset {
            asset_id: short_id("AST"),
            asset_type: asset_type.to_string(),
            assigned_to: assigned_to.map(String::from),
            status: if assigned_to.is_some() {
                AssetStatus::Assigned
            } else {
                AssetStatus::InStock
            },
        };
        self.ctx.store.insert_asset(asset.clone()).await;
        self.ctx
            .log_action(
                Self::NAME,
                "Track Asset",
                serde_json::json!({"asset_id": asset.asset_id, "asset_type": asset_type}),
                assigned_to.unwrap_or("System"),
            )
            .await;
        Ok(asset)
    }

    /// Scans for active access grants whose employee record no longer
    /// exists.
    pub async fn run_security_scan(&self) -> SecurityScanReport {
        let mut active_grants = 0;
        let mut orphaned_access = Vec::new();
        for record in self.ctx.store.access_records().await {
            if record.status != AccessStatus::Active {
                continue;
            }
            active_grants += 1;
            if self.ctx.store.employee(&record.employee_id).await.is_none() {
                orphaned_access.push(record);
            }
        }
        let findings: Vec<String> = orphaned_access
            .iter()
            .map(|r| {
                format!(
                    "active {} access for unknown employee {}",
                    r.system, r.employee_id
                )
            })
            .collect();

        self.ctx
            .log_action(
                Self::NAME,
                "Security Scan",
                serde_json::json!({"active_grants": active_grants,
                    "orphaned": orphaned_access.len()}),
                "System",
            )
            .await;

        SecurityScanReport {
            active_grants,
            orphaned_access,
            findings,
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

    /// Ticket creation shared by the capability path and the
    /// security-incident reaction (which may attribute the ticket to
    /// "SYSTEM" rather than a real employee).
    async fn open_ticket(
        &self,
        employee_id: &str,
        category: &str,
        description: &str,
        priority: TicketPriority,
    ) -> TicketReport {
        let suggestion = self
            .ctx
            .llm
            .generate(
                &format!("Suggest one short remediation step for this IT issue: {description}"),
                "You are an IT support assistant.",
            )
            .await;

        let ticket = ItTicket {
            ticket_id: short_id("TKT"),
            employee_id: employee_id.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            priority,
            status: TicketStatus::Open,
            created_at: Utc::now(),
            resolution: None,
            resolved_at: None,
            resolved_by: None,
        };
        let ticket_id = ticket.ticket_id.clone();
        self.ctx.store.insert_ticket(ticket).await;

        self.ctx
            .bus
            .publish(
                EventType::TicketCreated,
                serde_json::json!({"ticket_id": ticket_id, "employee_id": employee_id,
                    "category": category, "priority": priority}),
                Self::NAME,
            )
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Create Ticket",
                serde_json::json!({"ticket_id": ticket_id, "category": category,
                    "priority": priority}),
                employee_id,
            )
            .await;

        TicketReport {
            ticket_id,
            priority,
            suggestion,
        }
    }
}

#[async_trait]
impl EventHandler for ItAgent {
    fn handler_name(&self) -> &str {
        Self::NAME
    }

    async fn on_event(&self, event: &Event) -> OpsmeshResult<()> {
        match event.event_type {
            EventType::EmployeeOnboarded => {
                let employee_id = payload_str(event, "employee_id")?;
                for system in PROVISIONED_SYSTEMS {
                    self.grant_access(employee_id, system, "standard", "SYSTEM")
                        .await?;
                }
                Ok(())
            }
            EventType::EmployeeOffboarded => {
                let employee_id = payload_str(event, "employee_id")?;
                self.revoke_all_access(employee_id).await?;
                Ok(())
            }
            EventType::SecurityIncident => {
                let description = event.payload["description"]
                    .as_str()
                    .unwrap_or("reported security incident");
                let employee_id = event.payload["employee_id"].as_str().unwrap_or("SYSTEM");
                self.open_ticket(employee_id, "Security", description, TicketPriority::Critical)
                    .await;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Agent for ItAgent {
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
            EventType::EmployeeOffboarded,
            EventType::SecurityIncident,
        ]
    }

    fn ctx(&self) -> &AgentContext {
        &self.ctx
    }
}

fn payload_str<'a>(event: &'a Event, key: &str) -> OpsmeshResult<&'a str> {
    event.payload[key]
        .as_str()
        .ok_or_else(|| OpsmeshError::Bus(format!("event payload missing {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_context;
    use chrono::NaiveDate;
    use opsmesh_store::{Employee, LeaveType};

    fn agent() -> ItAgent {
        ItAgent::new(test_context("it"))
    }

    async fn seed_employee(it: &ItAgent, id: &str) {
        it.ctx
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
    async fn ticket_lifecycle() {
        let it = agent();
        seed_employee(&it, "EMP001").await;

        let report = it
            .create_ticket("EMP001", "Hardware", "laptop will not boot", TicketPriority::High)
            .await
            .unwrap();
        assert!(!report.suggestion.is_empty());

        let log = it.ctx.bus.event_log(10).await;
        assert_eq!(log[0].event_type, EventType::TicketCreated);

        let resolved = it
            .resolve_ticket(&report.ticket_id, "replaced battery", "EMP042")
            .await
            .unwrap();
        assert_eq!(resolved.status, TicketStatus::Resolved);
        assert_eq!(resolved.resolved_by.as_deref(), Some("EMP042"));

        // resolving twice is an error
        let err = it
            .resolve_ticket(&report.ticket_id, "again", "EMP042")
            .await
            .unwrap_err();
        assert!(matches!(err, OpsmeshError::Validation(_)));

        let log = it.ctx.bus.event_log(10).await;
        assert_eq!(log.last().unwrap().event_type, EventType::TicketResolved);
    }

    #[tokio::test]
    async fn ticket_requires_existing_employee() {
        let it = agent();
        let err = it
            .create_ticket("EMP404", "Hardware", "broken", TicketPriority::Low)
            .await
            .unwrap_err();
        assert!(matches!(err, OpsmeshError::NotFound(_)));
        assert!(it.ctx.bus.event_log(10).await.is_empty());
    }

    #[tokio::test]
    async fn access_grant_and_revoke_all() {
        let it = agent();
        seed_employee(&it, "EMP001").await;

        it.grant_access("EMP001", "VPN", "standard", "SYSTEM").await.unwrap();
        it.grant_access("EMP001", "Jira", "admin", "SYSTEM").await.unwrap();

        let revoked = it.revoke_all_access("EMP001").await.unwrap();
        assert_eq!(revoked, 2);
        // repeat is a no-op, not an error
        assert_eq!(it.revoke_all_access("EMP001").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn single_revoke_rejects_double_revoke() {
        let it = agent();
        seed_employee(&it, "EMP001").await;
        let record = it.grant_access("EMP001", "VPN", "standard", "SYSTEM").await.unwrap();

        let revoked = it.revoke_access(&record.record_id).await.unwrap();
        assert_eq!(revoked.status, AccessStatus::Revoked);
        assert!(revoked.revoked_at.is_some());

        let err = it.revoke_access(&record.record_id).await.unwrap_err();
        assert!(matches!(err, OpsmeshError::Validation(_)));
    }

    #[tokio::test]
    async fn license_seat_is_consumed() {
        let it = agent();
        seed_employee(&it, "EMP001").await;
        it.ctx
            .store
            .insert_license(SoftwareLicense {
                license_id: "LIC1".to_string(),
                software: "Jira".to_string(),
                assigned_to: None,
                status: LicenseStatus::Available,
            })
            .await;

        let seat = it.assign_license("EMP001", "Jira").await.unwrap();
        assert_eq!(seat.status, LicenseStatus::InUse);
        assert_eq!(seat.assigned_to.as_deref(), Some("EMP001"));

        // the only seat is taken now
        let err = it.assign_license("EMP001", "Jira").await.unwrap_err();
        assert!(matches!(err, OpsmeshError::NotFound(_)));
    }

    #[tokio::test]
    async fn asset_tracking_status_depends_on_assignment() {
        let it = agent();
        seed_employee(&it, "EMP001").await;

        let stocked = it.track_asset("Monitor", None).await.unwrap();
        assert_eq!(stocked.status, AssetStatus::InStock);

        let assigned = it.track_asset("Laptop", Some("EMP001")).await.unwrap();
        assert_eq!(assigned.status, AssetStatus::Assigned);
        assert_eq!(it.ctx.store.assets_for_employee("EMP001").await.len(), 1);
    }

    #[tokio::test]
    async fn security_scan_flags_orphaned_access() {
        let it = agent();
        seed_employee(&it, "EMP001").await;
        it.grant_access("EMP001", "VPN", "standard", "SYSTEM").await.unwrap();

        // grant for an employee that was never created
        it.ctx
            .store
            .insert_access_record(AccessRecord {
                record_id: "ACC-GHOST".to_string(),
                employee_id: "EMP999".to_string(),
                system: "Email".to_string(),
                access_level: "standard".to_string(),
                status: AccessStatus::Active,
                granted_at: Utc::now(),
                revoked_at: None,
                approved_by: "SYSTEM".to_string(),
            })
            .await;

        let report = it.run_security_scan().await;
        assert_eq!(report.active_grants, 2);
        assert_eq!(report.orphaned_access.len(), 1);
        assert_eq!(report.orphaned_access[0].employee_id, "EMP999");
        assert!(report.findings[0].contains("EMP999"));
    }

    #[tokio::test]
    async fn onboarded_event_provisions_standard_systems() {
        let it = agent();
        seed_employee(&it, "EMP001").await;

        let event = Event::new(
            EventType::EmployeeOnboarded,
            serde_json::json!({"employee_id": "EMP001"}),
            "HR Agent",
        );
        it.on_event(&event).await.unwrap();

        let records = it.ctx.store.access_for_employee("EMP001").await;
        assert_eq!(records.len(), 4);
        let systems: Vec<&str> = records.iter().map(|r| r.system.as_str()).collect();
        assert!(systems.contains(&"Email") && systems.contains(&"Slack"));
    }

    #[tokio::test]
    async fn onboarded_event_without_employee_id_is_an_error() {
        let it = agent();
        let event = Event::new(EventType::EmployeeOnboarded, serde_json::json!({}), "HR Agent");
        assert!(it.on_event(&event).await.is_err());
    }

    #[tokio::test]
    async fn offboarded_event_revokes_everything() {
        let it = agent();
        seed_employee(&it, "EMP001").await;
        it.grant_access("EMP001", "VPN", "standard", "SYSTEM").await.unwrap();

        let event = Event::new(
            EventType::EmployeeOffboarded,
            serde_json::json!({"employee_id": "EMP001"}),
            "HR Agent",
        );
        it.on_event(&event).await.unwrap();

        let records = it.ctx.store.access_for_employee("EMP001").await;
        assert!(records.iter().all(|r| r.status == AccessStatus::Revoked));
    }

    #[tokio::test]
    async fn security_incident_opens_critical_ticket() {
        let it = agent();
        let event = Event::new(
            EventType::SecurityIncident,
            serde_json::json!({"description": "credential leak detected"}),
            "Compliance Agent",
        );
        it.on_event(&event).await.unwrap();

        let audit = it.ctx.audit.list(None, None).await;
        let created = audit.iter().find(|e| e.action == "Create Ticket").unwrap();
        assert_eq!(created.user, "SYSTEM");
    }
}
