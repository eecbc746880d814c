//! Orchestrator data model: workflow runs, escalations, dashboard reports.

use chrono::{DateTime, Utc};
use opsmesh_core::Decision;
use serde::Serialize;
use uuid::Uuid;

/// Lifecycle of a workflow run. Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkflowStatus {
    /// Steps are still executing.
    InProgress,
    /// All steps ran; individual steps may still have recorded errors.
    Completed,
    /// Aborted by a handler-level error (bad parameters, infrastructure).
    Failed,
}

/// One executed workflow step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Capability that was invoked.
    pub step_name: String,
    /// Agent that ran it.
    pub agent: String,
    /// "ok[: detail]" or "error: detail".
    pub result_status: String,
    /// When the step finished.
    pub timestamp: DateTime<Utc>,
}

/// One workflow execution, discoverable while active and after completion.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun {
    /// Run id of the form `WF-XXXXXXXX`.
    pub id: String,
    /// Workflow name from the registry.
    pub name: String,
    /// Input parameters as given.
    pub params: serde_json::Value,
    /// Current lifecycle state.
    pub status: WorkflowStatus,
    /// Steps in execution order.
    pub steps: Vec<StepRecord>,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// Terminal time, once Completed or Failed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Captured handler-level error for Failed runs.
    pub error: Option<String>,
}

/// A low-confidence decision parked for human review. The decision was not
/// acted on and not recorded in the agent's learning store.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationEntry {
    /// The task that was dispatched.
    pub task: String,
    /// The dispatch context.
    pub context: String,
    /// What the agent would have done.
    pub decision_attempt: Decision,
    /// The confidence that fell below the threshold.
    pub confidence: f64,
    /// When it was escalated.
    pub timestamp: DateTime<Utc>,
}

/// Routing verdict for one task.
#[derive(Debug, Clone, Serialize)]
pub struct RoutedTask {
    /// Key of the chosen agent.
    pub agent_key: String,
    /// The raw router response, kept for explainability.
    pub reasoning: String,
}

/// Outcome of one dispatch through the confidence gate.
#[derive(Debug, Clone, Serialize)]
pub enum DispatchOutcome {
    /// Confidence cleared the threshold; the decision was recorded and is
    /// actionable.
    Actioned {
        /// Deciding agent.
        agent_key: String,
        /// The decision.
        decision: Decision,
        /// Learning-store record id.
        record_id: Uuid,
    },
    /// Confidence fell short; exactly one escalation entry was queued.
    NeedsHumanReview {
        /// Deciding agent.
        agent_key: String,
        /// The queued entry.
        entry: EscalationEntry,
    },
}

/// Dashboard line for one agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatusReport {
    /// Routing key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Operational state; always "Active" while the agent is registered.
    pub status: String,
    /// Advertised capabilities.
    pub capabilities: Vec<String>,
    /// Retained decision count from the agent's learning store.
    pub decisions_made: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_run_serializes_for_dashboards() {
        let run = WorkflowRun {
            id: "WF-1A2B3C4D".to_string(),
            name: "new_hire".to_string(),
            params: serde_json::json!({"name": "Alice"}),
            status: WorkflowStatus::Completed,
            steps: vec![StepRecord {
                step_name: "onboard_employee".to_string(),
                agent: "HR Agent".to_string(),
                result_status: "ok".to_string(),
                timestamp: Utc::now(),
            }],
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            error: None,
        };
        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["status"], "Completed");
        assert_eq!(json["steps"][0]["step_name"], "onboard_employee");
    }

    #[test]
    fn dispatch_outcome_tags_variants() {
        let outcome = DispatchOutcome::NeedsHumanReview {
            agent_key: "finance".to_string(),
            entry: EscalationEntry {
                task: "approve this".to_string(),
                context: String::new(),
                decision_attempt: Decision::fallback("unparseable"),
                confidence: 0.0,
                timestamp: Utc::now(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("NeedsHumanReview").is_some());
    }
}
