//! Core types and error definitions for the Opsmesh coordination layer.
//!
//! This crate provides the foundational types shared across all Opsmesh
//! crates: error handling, the event model, agent decisions, configuration,
//! and the shared audit trail.
//!
//! # Main types
//!
//! - [`OpsmeshError`] — Unified error enum for all Opsmesh subsystems.
//! - [`OpsmeshResult`] — Convenience alias for `Result<T, OpsmeshError>`.
//! - [`Event`] / [`EventType`] — Immutable notifications broadcast on the bus.
//! - [`Decision`] — The confidence-scored output of an agent reasoning step.
//! - [`Settings`] — Numeric policy knobs consumed by agents and orchestrator.
//! - [`AuditTrail`] — Append-only record of every agent action.

/// Append-only audit trail shared by all agents.
pub mod audit;
/// Configuration knobs with serde defaults.
pub mod config;
/// Event model: the closed event-type enum and the immutable event record.
pub mod event;

pub use audit::{AuditEntry, AuditTrail};
pub use config::Settings;
pub use event::{Event, EventType};

use serde::{Deserialize, Serialize};

// --- Error types ---

/// Top-level error type for the Opsmesh coordination layer.
///
/// `Validation` and `NotFound` are the "domain error" shapes capability
/// operations surface without mutating anything; the remaining variants
/// correspond to subsystems.
#[derive(Debug, thiserror::Error)]
pub enum OpsmeshError {
    /// An error originating from an agent capability operation.
    #[error("Agent error: {0}")]
    Agent(String),

    /// An error from the event bus.
    #[error("Bus error: {0}")]
    Bus(String),

    /// An error from the entity store.
    #[error("Store error: {0}")]
    Store(String),

    /// An error from the LLM service boundary (internal; the service facade
    /// degrades to its deterministic fallback instead of surfacing this).
    #[error("LLM error: {0}")]
    Llm(String),

    /// An error from the workflow engine or task router.
    #[error("Orchestrator error: {0}")]
    Orchestrator(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// Bad input: malformed date range, invalid amount, unsupported value.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced entity (employee, ticket, expense, ...) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`OpsmeshError`].
pub type OpsmeshResult<T> = Result<T, OpsmeshError>;

// --- Decision ---

/// The atomic output of an agent's autonomous reasoning step.
///
/// Never persisted on its own; the learning store wraps acted-upon decisions
/// into records, and the orchestrator wraps low-confidence ones into
/// escalation entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// The action the agent proposes to take.
    pub action: String,
    /// The agent's reasoning chain, verbatim.
    pub reasoning: String,
    /// Confidence in `[0, 1]`; gates autonomous action vs. escalation.
    pub confidence: f64,
}

impl Decision {
    /// Creates a decision, clamping confidence into `[0, 1]`.
    pub fn new(
        action: impl Into<String>,
        reasoning: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            action: action.into(),
            reasoning: reasoning.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// The zero-confidence default used when LLM output cannot be parsed.
    /// Always escalates under any sane threshold.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            action: "escalate".to_string(),
            reasoning: reason.into(),
            confidence: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_clamps_confidence() {
        assert_eq!(Decision::new("a", "r", 1.7).confidence, 1.0);
        assert_eq!(Decision::new("a", "r", -0.2).confidence, 0.0);
        assert_eq!(Decision::new("a", "r", 0.42).confidence, 0.42);
    }

    #[test]
    fn fallback_decision_is_zero_confidence() {
        let d = Decision::fallback("could not parse plan");
        assert_eq!(d.action, "escalate");
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn error_display_includes_subsystem() {
        let e = OpsmeshError::NotFound("employee EMP999".to_string());
        assert!(e.to_string().contains("Not found"));
        let e = OpsmeshError::Validation("end date before start date".to_string());
        assert!(e.to_string().starts_with("Validation"));
    }
}
