//! The agent contract and the four domain agents (HR, IT, Finance,
//! Compliance).
//!
//! Every agent owns a set of capability operations (validate, mutate the
//! store, publish events, audit, return a typed report), reacts to bus
//! events it subscribes to, and can produce a confidence-scored [`Decision`]
//! for a free-form task via the shared `decide` flow. Each agent carries its
//! own [`LearningStore`]; everything else in [`AgentContext`] is shared.

/// Compliance agent: violations, trainings, audits.
pub mod compliance;
/// Finance agent: expenses, payroll, budgets, reimbursements.
pub mod finance;
/// Goal targets and observed metrics.
pub mod goals;
/// HR agent: leave, onboarding, policy, recruiting.
pub mod hr;
/// IT agent: tickets, access, licenses, assets.
pub mod it;
/// Per-agent decision memory with file persistence.
pub mod learning;

pub use compliance::ComplianceAgent;
pub use finance::FinanceAgent;
pub use goals::{Goal, GoalDirection, GoalReport, GoalTracker};
pub use hr::HrAgent;
pub use it::ItAgent;
pub use learning::{DecisionRecord, LearningStore, OverrideRecord, PerformanceStats};

use async_trait::async_trait;
use opsmesh_bus::{EventBus, EventHandler};
use opsmesh_core::{AuditTrail, Decision, EventType, Settings};
use opsmesh_llm::LlmService;
use opsmesh_store::EntityStore;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Everything an agent needs injected: shared infrastructure plus its own
/// learning store.
#[derive(Clone)]
pub struct AgentContext {
    /// Shared entity store.
    pub store: Arc<EntityStore>,
    /// Shared LLM facade.
    pub llm: Arc<LlmService>,
    /// Shared event bus.
    pub bus: Arc<EventBus>,
    /// Shared append-only audit trail.
    pub audit: Arc<AuditTrail>,
    /// This agent's decision memory.
    pub learning: Arc<LearningStore>,
    /// Policy knobs.
    pub settings: Settings,
}

impl AgentContext {
    /// Appends one audit entry for a capability operation.
    pub async fn log_action(
        &self,
        agent: &str,
        action: &str,
        details: serde_json::Value,
        user: &str,
    ) {
        self.audit.append(agent, action, details, user).await;
    }
}

/// The contract every domain agent fulfills.
///
/// `decide` is provided: it prompts the LLM with the agent's capabilities
/// and up to three relevant past decisions, then parses the JSON reply.
/// Unparseable output (including the rule-based fallback text) becomes a
/// zero-confidence escalation, which the orchestrator's gate always routes
/// to a human.
#[async_trait]
pub trait Agent: EventHandler {
    /// Stable lowercase routing key ("hr", "it", ...).
    fn key(&self) -> &'static str;

    /// Human-readable name used in audit entries and logs.
    fn name(&self) -> &'static str;

    /// Capability names advertised to the router.
    fn capabilities(&self) -> &'static [&'static str];

    /// Event types this agent reacts to.
    fn subscriptions(&self) -> &'static [EventType];

    /// The injected collaborators.
    fn ctx(&self) -> &AgentContext;

    /// Produces a confidence-scored decision for a free-form task.
    async fn decide(&self, task: &str, context: &str) -> Decision {
        let ctx = self.ctx();
        let examples = ctx.learning.relevant_examples(task, 3).await;

        let mut prompt = format!("Task: {task}\n");
        if !context.is_empty() {
            prompt.push_str(&format!("Context: {context}\n"));
        }
        if !examples.is_empty() {
            prompt.push_str("Relevant past decisions:\n");
            for ex in &examples {
                prompt.push_str(&format!(
                    "- task: {}; action: {}; confidence: {:.2}\n",
                    ex.task, ex.decision.action, ex.decision.confidence
                ));
            }
        }
        prompt.push_str(
            "Respond with exactly one JSON object: \
             {\"action\": \"...\", \"reasoning\": \"...\", \"confidence\": 0.0}",
        );

        let system = format!(
            "You are the {} of an internal operations platform. \
             Your capabilities: {}. Decide how to handle the task and reply with JSON only.",
            self.name(),
            self.capabilities().join(", ")
        );

        let raw = ctx.llm.generate_structured(&prompt, &system).await;
        parse_decision(&raw)
            .unwrap_or_else(|| Decision::fallback(format!("unparseable decision output: {raw}")))
    }
}

/// Extracts a `{action, reasoning, confidence}` object from raw model
/// output. Tolerates surrounding prose by slicing from the first `{` to the
/// last `}`; missing fields default (action "escalate", confidence 0).
pub fn parse_decision(raw: &str) -> Option<Decision> {
    #[derive(Deserialize)]
    struct Wire {
        action: Option<String>,
        reasoning: Option<String>,
        confidence: Option<f64>,
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    let wire: Wire = serde_json::from_str(&raw[start..=end]).ok()?;
    Some(Decision::new(
        wire.action.unwrap_or_else(|| "escalate".to_string()),
        wire.reasoning.unwrap_or_default(),
        wire.confidence.unwrap_or(0.0),
    ))
}

/// Subscribes each agent to its declared event types, in agent order
/// HR, IT, Finance, Compliance. Fan-out order within one event type follows
/// this registration order.
pub async fn wire_event_subscriptions(
    bus: &EventBus,
    hr: &Arc<HrAgent>,
    it: &Arc<ItAgent>,
    finance: &Arc<FinanceAgent>,
    compliance: &Arc<ComplianceAgent>,
) {
    for event_type in hr.subscriptions() {
        bus.subscribe(*event_type, hr.clone()).await;
    }
    for event_type in it.subscriptions() {
        bus.subscribe(*event_type, it.clone()).await;
    }
    for event_type in finance.subscriptions() {
        bus.subscribe(*event_type, finance.clone()).await;
    }
    for event_type in compliance.subscriptions() {
        bus.subscribe(*event_type, compliance.clone()).await;
    }
}

/// Short uppercase id with a domain prefix, e.g. `TKT-1A2B3C4D`.
pub(crate) fn short_id(prefix: &str) -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", raw[..8].to_uppercase())
}

#[cfg(test)]
pub(crate) fn test_context(agent: &str) -> AgentContext {
    AgentContext {
        store: Arc::new(EntityStore::new()),
        llm: Arc::new(LlmService::fallback_only()),
        bus: Arc::new(EventBus::default()),
        audit: Arc::new(AuditTrail::new()),
        learning: Arc::new(LearningStore::new_in_memory(agent)),
        settings: Settings::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_decision_handles_clean_json() {
        let d = parse_decision(r#"{"action": "approve", "reasoning": "ok", "confidence": 0.9}"#)
            .unwrap();
        assert_eq!(d.action, "approve");
        assert_eq!(d.confidence, 0.9);
    }

    #[test]
    fn parse_decision_slices_surrounding_prose() {
        let raw = "Sure! Here is my answer:\n{\"action\": \"reject\", \"confidence\": 0.7}\nDone.";
        let d = parse_decision(raw).unwrap();
        assert_eq!(d.action, "reject");
        assert_eq!(d.reasoning, "");
        assert_eq!(d.confidence, 0.7);
    }

    #[test]
    fn parse_decision_clamps_out_of_range_confidence() {
        let d = parse_decision(r#"{"action": "approve", "confidence": 3.5}"#).unwrap();
        assert_eq!(d.confidence, 1.0);
    }

    #[test]
    fn parse_decision_rejects_plain_text() {
        assert!(parse_decision("please contact HR for assistance").is_none());
        assert!(parse_decision("} backwards {").is_none());
        assert!(parse_decision("{not valid json}").is_none());
    }

    #[test]
    fn parse_decision_defaults_missing_fields() {
        let d = parse_decision("{}").unwrap();
        assert_eq!(d.action, "escalate");
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn short_id_has_prefix_and_length() {
        let id = short_id("TKT");
        assert!(id.starts_with("TKT-"));
        assert_eq!(id.len(), 12);
    }
}
