//! Task routing, the confidence gate, and the fixed workflow registry.

use crate::types::{
    AgentStatusReport, DispatchOutcome, EscalationEntry, RoutedTask, StepRecord, WorkflowRun,
    WorkflowStatus,
};
use chrono::Utc;
use opsmesh_agents::{Agent, ComplianceAgent, FinanceAgent, HrAgent, ItAgent};
use opsmesh_bus::EventBus;
use opsmesh_core::{EventType, OpsmeshError, OpsmeshResult, Settings};
use opsmesh_llm::LlmService;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Completed (or failed) runs kept for dashboards.
const COMPLETED_HISTORY: usize = 20;

/// Names accepted by `execute_workflow`.
pub const WORKFLOWS: &[&str] = &["new_hire", "employee_exit", "expense_claim", "security_incident"];

/// Coordinates the four domain agents: routes free-form tasks, gates
/// autonomous decisions by confidence, and runs the fixed workflows.
///
/// Workflows are not transactional. Steps that fail at the domain level
/// (missing entity, invalid state) are recorded and execution continues;
/// only handler-level failures (bad parameters) abort the run as Failed.
pub struct Orchestrator {
    hr: Arc<HrAgent>,
    it: Arc<ItAgent>,
    finance: Arc<FinanceAgent>,
    compliance: Arc<ComplianceAgent>,
    /// Registration order; also the routing tie-break order.
    agents: Vec<Arc<dyn Agent>>,
    bus: Arc<EventBus>,
    llm: Arc<LlmService>,
    settings: Settings,
    active: RwLock<HashMap<String, WorkflowRun>>,
    completed: RwLock<Vec<WorkflowRun>>,
    escalations: RwLock<Vec<EscalationEntry>>,
}

impl Orchestrator {
    /// Builds the orchestrator over the four wired agents.
    pub fn new(
        hr: Arc<HrAgent>,
        it: Arc<ItAgent>,
        finance: Arc<FinanceAgent>,
        compliance: Arc<ComplianceAgent>,
        bus: Arc<EventBus>,
        llm: Arc<LlmService>,
        settings: Settings,
    ) -> Self {
        let agents: Vec<Arc<dyn Agent>> = vec![
            hr.clone(),
            it.clone(),
            finance.clone(),
            compliance.clone(),
        ];
        Self {
            hr,
            it,
            finance,
            compliance,
            agents,
            bus,
            llm,
            settings,
            active: RwLock::new(HashMap::new()),
            completed: RwLock::new(Vec::new()),
            escalations: RwLock::new(Vec::new()),
        }
    }

    /// Picks the agent for a free-form task. The router prompt enumerates
    /// agent keys and capabilities, plus the caller's context when one is
    /// given; the reply is matched by key substring in registration order.
    /// An unmatchable reply falls back to HR, which owns general employee
    /// queries. Routing never fails.
    pub async fn route_task(&self, task: &str, context: &str) -> RoutedTask {
        let mut prompt = format!("Pick the best agent for this task.\nTask: {task}\n");
        if !context.is_empty() {
            prompt.push_str(&format!("Context: {context}\n"));
        }
        prompt.push_str("Agents:\n");
        for agent in &self.agents {
            prompt.push_str(&format!(
                "- {}: {}\n",
                agent.key(),
                agent.capabilities().join(", ")
            ));
        }
        prompt.push_str("Reply with one agent key only.");

        let reasoning = self
            .llm
            .generate(&prompt, "You are a task router. Reply with a single agent key.")
            .await;
        let reply = reasoning.to_lowercase();

        let agent_key = self
            .agents
            .iter()
            .find(|a| reply.contains(a.key()))
            .map(|a| a.key().to_string())
            .unwrap_or_else(|| HrAgent::KEY.to_string());

        info!(task, agent = %agent_key, "routed task");
        RoutedTask {
            agent_key,
            reasoning,
        }
    }

    /// Routes a task, lets the chosen agent decide, and applies the
    /// confidence gate: below the threshold the decision is parked as
    /// exactly one escalation entry and nothing is recorded; at or above it,
    /// exactly one record lands in the agent's learning store.
    pub async fn dispatch(&self, task: &str, context: &str) -> DispatchOutcome {
        let routed = self.route_task(task, context).await;
        let agent = self.agent_by_key(&routed.agent_key);
        let decision = agent.decide(task, context).await;

        if decision.confidence < self.settings.escalation_confidence_threshold {
            let entry = EscalationEntry {
                task: task.to_string(),
                context: context.to_string(),
                confidence: decision.confidence,
                decision_attempt: decision,
                timestamp: Utc::now(),
            };
            warn!(
                task,
                agent = %routed.agent_key,
                confidence = entry.confidence,
                threshold = self.settings.escalation_confidence_threshold,
                "decision escalated for human review"
            );
            self.escalations.write().await.push(entry.clone());
            return DispatchOutcome::NeedsHumanReview {
                agent_key: routed.agent_key,
                entry,
            };
        }

        let record = agent
            .ctx()
            .learning
            .record_decision(task, context, decision.clone())
            .await;
        info!(
            task,
            agent = %routed.agent_key,
            action = %decision.action,
            confidence = decision.confidence,
            "decision recorded"
        );
        DispatchOutcome::Actioned {
            agent_key: routed.agent_key,
            decision,
            record_id: record.decision_id,
        }
    }

    /// Runs one registered workflow to its terminal state and returns the
    /// run. Unknown names are an error and create no run; a Failed run is
    /// returned normally with its error captured.
    pub async fn execute_workflow(
        &self,
        name: &str,
        params: serde_json::Value,
    ) -> OpsmeshResult<WorkflowRun> {
        if !WORKFLOWS.contains(&name) {
            return Err(OpsmeshError::Orchestrator(format!("unknown workflow {name}")));
        }

        let raw = Uuid::new_v4().simple().to_string();
        let mut run = WorkflowRun {
            id: format!("WF-{}", raw[..8].to_uppercase()),
            name: name.to_string(),
            params: params.clone(),
            status: WorkflowStatus::InProgress,
            steps: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        };
        self.active.write().await.insert(run.id.clone(), run.clone());
        info!(workflow = name, run_id = %run.id, "workflow started");

        let result = match name {
            "new_hire" => self.wf_new_hire(&mut run, &params).await,
            "employee_exit" => self.wf_employee_exit(&mut run, &params).await,
            "expense_claim" => self.wf_expense_claim(&mut run, &params).await,
            _ => self.wf_security_incident(&mut run, &params).await,
        };

        match result {
            Ok(()) => run.status = WorkflowStatus::Completed,
            Err(e) => {
                warn!(workflow = name, run_id = %run.id, error = %e, "workflow failed");
                run.status = WorkflowStatus::Failed;
                run.error = Some(e.to_string());
            }
        }
        run.completed_at = Some(Utc::now());

        self.active.write().await.remove(&run.id);
        let mut completed = self.completed.write().await;
        completed.push(run.clone());
        if completed.len() > COMPLETED_HISTORY {
            let excess = completed.len() - COMPLETED_HISTORY;
            completed.drain(..excess);
        }
        info!(workflow = name, run_id = %run.id, status = ?run.status, "workflow finished");
        Ok(run)
    }

    /// HR onboarding; IT, Finance, and Compliance effects ride the
    /// `EmployeeOnboarded` event inside the one HR call.
    async fn wf_new_hire(
        &self,
        run: &mut WorkflowRun,
        params: &serde_json::Value,
    ) -> OpsmeshResult<()> {
        let name = param_str(params, "name")?;
        let email = param_str(params, "email")?;
        let department = param_str(params, "department")?;
        let position = param_str(params, "position")?;

        let report = self.hr.onboard_employee(name, email, department, position).await?;
        record_step(
            run,
            "onboard_employee",
            "HR Agent",
            &format!("ok: {}", report.employee_id),
        );
        Ok(())
    }

    /// HR exit log, IT access revocation, Finance final pay, Compliance
    /// clearance. Domain errors in any step are recorded and the remaining
    /// steps still run.
    async fn wf_employee_exit(
        &self,
        run: &mut WorkflowRun,
        params: &serde_json::Value,
    ) -> OpsmeshResult<()> {
        let employee_id = param_str(params, "employee_id")?;

        match self.hr.log_exit(employee_id).await {
            Ok(_) => record_step(run, "log_exit", "HR Agent", "ok"),
            Err(e) => record_step(run, "log_exit", "HR Agent", &format!("error: {e}")),
        }
        match self.it.revoke_all_access(employee_id).await {
            Ok(count) => record_step(
                run,
                "revoke_all_access",
                "IT Agent",
                &format!("ok: revoked {count}"),
            ),
            Err(e) => record_step(run, "revoke_all_access", "IT Agent", &format!("error: {e}")),
        }
        match self.finance.settle_final_pay(employee_id).await {
            Ok(record) => record_step(
                run,
                "settle_final_pay",
                "Finance Agent",
                &format!("ok: net {:.2}", record.net_salary),
            ),
            Err(e) => record_step(run, "settle_final_pay", "Finance Agent", &format!("error: {e}")),
        }
        match self.compliance.exit_compliance_check(employee_id).await {
            Ok(report) => record_step(
                run,
                "exit_compliance_check",
                "Compliance Agent",
                if report.clear { "ok: clear" } else { "ok: open items" },
            ),
            Err(e) => record_step(
                run,
                "exit_compliance_check",
                "Compliance Agent",
                &format!("error: {e}"),
            ),
        }
        Ok(())
    }

    async fn wf_expense_claim(
        &self,
        run: &mut WorkflowRun,
        params: &serde_json::Value,
    ) -> OpsmeshResult<()> {
        let employee_id = param_str(params, "employee_id")?;
        let amount = params["amount"].as_f64().ok_or_else(|| {
            OpsmeshError::Validation("workflow parameter amount is required".to_string())
        })?;
        let category = params["category"].as_str().unwrap_or("General");
        let description = params["description"].as_str().unwrap_or("");

        match self
            .finance
            .submit_expense(employee_id, category, amount, description)
            .await
        {
            Ok(report) => record_step(
                run,
                "submit_expense",
                "Finance Agent",
                &format!("ok: {:?}", report.status),
            ),
            Err(e) => record_step(run, "submit_expense", "Finance Agent", &format!("error: {e}")),
        }
        Ok(())
    }

    /// Announces the incident (triggering the IT ticket and the Compliance
    /// violation reactions), then runs the scan and the audit.
    async fn wf_security_incident(
        &self,
        run: &mut WorkflowRun,
        params: &serde_json::Value,
    ) -> OpsmeshResult<()> {
        let description = params["description"]
            .as_str()
            .unwrap_or("reported security incident");

        self.bus
            .publish(
                EventType::SecurityIncident,
                serde_json::json!({"description": description,
                    "employee_id": params["employee_id"]}),
                "Orchestrator",
            )
            .await;

        let scan = self.it.run_security_scan().await;
        record_step(
            run,
            "run_security_scan",
            "IT Agent",
            &format!("ok: {} findings", scan.findings.len()),
        );

        let audit = self.compliance.run_compliance_audit("security_incident").await;
        record_step(
            run,
            "run_compliance_audit",
            "Compliance Agent",
            &format!("ok: {:?}", audit.status),
        );
        Ok(())
    }

    /// Dashboard line per agent, in registration order.
    pub async fn agent_statuses(&self) -> Vec<AgentStatusReport> {
        let mut reports = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            reports.push(AgentStatusReport {
                key: agent.key().to_string(),
                name: agent.name().to_string(),
                status: "Active".to_string(),
                capabilities: agent.capabilities().iter().map(|c| (*c).to_string()).collect(),
                decisions_made: agent.ctx().learning.total_decisions().await,
            });
        }
        reports
    }

    /// Runs still in progress.
    pub async fn active_workflows(&self) -> Vec<WorkflowRun> {
        let active = self.active.read().await;
        let mut runs: Vec<WorkflowRun> = active.values().cloned().collect();
        runs.sort_by_key(|r| r.started_at);
        runs
    }

    /// The most recent terminal runs, oldest first, at most `limit`.
    pub async fn completed_workflows(&self, limit: usize) -> Vec<WorkflowRun> {
        let completed = self.completed.read().await;
        let start = completed.len().saturating_sub(limit);
        completed[start..].to_vec()
    }

    /// Escalations awaiting human review, oldest first.
    pub async fn escalation_queue(&self) -> Vec<EscalationEntry> {
        self.escalations.read().await.clone()
    }

    fn agent_by_key(&self, key: &str) -> Arc<dyn Agent> {
        self.agents
            .iter()
            .find(|a| a.key() == key)
            .unwrap_or(&self.agents[0])
            .clone()
    }
}

fn record_step(run: &mut WorkflowRun, step_name: &str, agent: &str, result_status: &str) {
    run.steps.push(StepRecord {
        step_name: step_name.to_string(),
        agent: agent.to_string(),
        result_status: result_status.to_string(),
        timestamp: Utc::now(),
    });
}

fn param_str<'a>(params: &'a serde_json::Value, key: &str) -> OpsmeshResult<&'a str> {
    params[key]
        .as_str()
        .ok_or_else(|| OpsmeshError::Validation(format!("workflow parameter {key} is required")))
}
