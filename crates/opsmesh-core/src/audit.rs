use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// One immutable audit record: which agent did what, for whom, when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier for this entry.
    pub log_id: Uuid,
    /// UTC timestamp assigned at append time.
    pub timestamp: DateTime<Utc>,
    /// The agent that performed the action.
    pub agent: String,
    /// Short action name ("Process Leave Request", "Grant Access", ...).
    pub action: String,
    /// Structured action-specific details.
    pub details: serde_json::Value,
    /// The user or entity the action was performed for.
    pub user: String,
}

/// Append-only audit trail shared by all agents.
///
/// Entries are never mutated or removed; `list` returns a chronological
/// slice, optionally bounded by a time window.
pub struct AuditTrail {
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditTrail {
    /// Creates an empty trail.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Appends one entry and emits a structured log line.
    pub async fn append(
        &self,
        agent: impl Into<String>,
        action: impl Into<String>,
        details: serde_json::Value,
        user: impl Into<String>,
    ) -> AuditEntry {
        let entry = AuditEntry {
            log_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            agent: agent.into(),
            action: action.into(),
            details,
            user: user.into(),
        };
        info!(agent = %entry.agent, action = %entry.action, user = %entry.user, "audit");
        self.entries.write().await.push(entry.clone());
        entry
    }

    /// Returns entries in chronological order, filtered to the given window.
    /// `None` bounds are open-ended.
    pub async fn list(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| since.map_or(true, |s| e.timestamp >= s))
            .filter(|e| until.map_or(true, |u| e.timestamp <= u))
            .cloned()
            .collect()
    }

    /// Total number of entries ever appended.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True if nothing has been appended yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}
