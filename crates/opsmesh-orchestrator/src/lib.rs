//! Orchestration layer for the Opsmesh coordination platform.
//!
//! The [`Orchestrator`] sits above the four domain agents and provides:
//!
//! - **Task routing** — LLM-assisted selection of the agent for a free-form
//!   task, with a deterministic HR fallback.
//! - **The confidence gate** — [`Orchestrator::dispatch`] turns each routed
//!   task into either one recorded, actionable decision or one escalation
//!   entry for human review, never both.
//! - **Workflows** — a fixed registry of multi-agent sequences
//!   (`new_hire`, `employee_exit`, `expense_claim`, `security_incident`)
//!   with per-step records and a bounded completed history.
//! - **Dashboards** — agent statuses, active/completed runs, and the
//!   escalation queue.

/// Routing, dispatch, and workflow execution.
pub mod engine;
/// Workflow and dashboard data types.
pub mod types;

pub use engine::{Orchestrator, WORKFLOWS};
pub use types::{
    AgentStatusReport, DispatchOutcome, EscalationEntry, RoutedTask, StepRecord, WorkflowRun,
    WorkflowStatus,
};
