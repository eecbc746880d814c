use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of event types agents may publish or subscribe to.
///
/// A closed enum (rather than free-form strings) means a typo'd event type is
/// a compile error and every agent's interest set is auditable at a glance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// HR created a new employee record; IT/Finance/Compliance react.
    EmployeeOnboarded,
    /// An employee left; access is revoked and records closed out.
    EmployeeOffboarded,
    /// A leave request reached a terminal or pending decision.
    LeaveProcessed,
    /// An IT support ticket was opened.
    TicketCreated,
    /// An IT support ticket was resolved.
    TicketResolved,
    /// An expense claim entered the system.
    ExpenseSubmitted,
    /// A payroll batch run finished.
    PayrollProcessed,
    /// A compliance violation was reported.
    ViolationReported,
    /// A security incident was raised.
    SecurityIncident,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::EmployeeOnboarded => "employee_onboarded",
            EventType::EmployeeOffboarded => "employee_offboarded",
            EventType::LeaveProcessed => "leave_processed",
            EventType::TicketCreated => "ticket_created",
            EventType::TicketResolved => "ticket_resolved",
            EventType::ExpenseSubmitted => "expense_submitted",
            EventType::PayrollProcessed => "payroll_processed",
            EventType::ViolationReported => "violation_reported",
            EventType::SecurityIncident => "security_incident",
        };
        write!(f, "{s}")
    }
}

/// An immutable, timestamped notification broadcast via the event bus.
///
/// Created at publish time and appended to the bus log in publish order;
/// never mutated or deleted afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event.
    pub id: Uuid,
    /// The event type.
    pub event_type: EventType,
    /// Structured payload; shape is event-type specific.
    pub payload: serde_json::Value,
    /// Label of the publisher ("HR Agent", "System", ...).
    pub source: String,
    /// UTC timestamp assigned at publish time.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Creates a new event stamped with the current time.
    pub fn new(event_type: EventType, payload: serde_json::Value, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            payload,
            source: source.into(),
            timestamp: Utc::now(),
        }
    }
}
