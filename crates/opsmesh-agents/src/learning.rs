//! Per-agent decision memory.
//!
//! Every acted-upon decision and every human override is appended here and
//! persisted to a JSON file after each write. The store is the retrieval
//! source for `decide` few-shot examples and the numerator/denominator for
//! performance stats. A corrupt or missing file degrades to an empty store
//! rather than failing startup.

use chrono::{DateTime, Utc};
use opsmesh_core::{Decision, OpsmeshError, OpsmeshResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// Decisions kept before the oldest are dropped.
const MAX_DECISIONS: usize = 500;
/// Overrides kept before the oldest are dropped.
const MAX_OVERRIDES: usize = 100;

/// One acted-upon decision, as remembered by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Unique id, referenced by overrides.
    pub decision_id: Uuid,
    /// The task text the decision answered.
    pub task: String,
    /// Context supplied alongside the task, possibly empty.
    #[serde(default)]
    pub context: String,
    /// The decision itself.
    pub decision: Decision,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
    /// Set once a human override references this decision.
    pub overridden: bool,
    /// What actually happened, once known; overrides fill this with the
    /// human's action.
    #[serde(default)]
    pub outcome: Option<String>,
}

/// A human correction of a past decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRecord {
    /// Unique id.
    pub override_id: Uuid,
    /// The decision being corrected.
    pub decision_id: Uuid,
    /// What the human did instead.
    pub human_action: String,
    /// Why.
    pub reason: String,
    /// When.
    pub timestamp: DateTime<Utc>,
}

/// Aggregate stats over the retained window, recomputed on demand.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStats {
    /// Retained decision count.
    pub total_decisions: usize,
    /// Retained override count.
    pub total_overrides: usize,
    /// Overrides as a percentage of decisions; 0 when no decisions exist.
    pub override_rate_percent: f64,
    /// Mean confidence across retained decisions; 0 when none exist.
    pub average_confidence: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    decisions: Vec<DecisionRecord>,
    overrides: Vec<OverrideRecord>,
}

/// File-backed decision memory for one agent.
pub struct LearningStore {
    agent: String,
    path: Option<PathBuf>,
    state: RwLock<State>,
}

impl LearningStore {
    /// A store with no backing file; nothing survives the process.
    pub fn new_in_memory(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            path: None,
            state: RwLock::new(State::default()),
        }
    }

    /// Opens (or creates) the store backed by `path`. An unreadable or
    /// corrupt file is logged and replaced with an empty state on the next
    /// write.
    pub fn open(agent: impl Into<String>, path: PathBuf) -> Self {
        let agent = agent.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    warn!(agent = %agent, path = %path.display(), error = %e,
                        "corrupt learning file; starting empty");
                    State::default()
                }
            },
            Err(_) => State::default(),
        };
        Self {
            agent,
            path: Some(path),
            state: RwLock::new(state),
        }
    }

    /// The agent this store belongs to.
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Appends one decision, trims the window, persists.
    pub async fn record_decision(
        &self,
        task: &str,
        context: &str,
        decision: Decision,
    ) -> DecisionRecord {
        let record = DecisionRecord {
            decision_id: Uuid::new_v4(),
            task: task.to_string(),
            context: context.to_string(),
            decision,
            timestamp: Utc::now(),
            overridden: false,
            outcome: None,
        };
        let mut state = self.state.write().await;
        state.decisions.push(record.clone());
        if state.decisions.len() > MAX_DECISIONS {
            let excess = state.decisions.len() - MAX_DECISIONS;
            state.decisions.drain(..excess);
        }
        self.persist(&state);
        record
    }

    /// Appends one override, marks the referenced decision, and sets its
    /// outcome to the human's action. The decision must still be in the
    /// retained window.
    pub async fn record_override(
        &self,
        decision_id: Uuid,
        human_action: &str,
        reason: &str,
    ) -> OpsmeshResult<OverrideRecord> {
        let mut state = self.state.write().await;
        let decision = state
            .decisions
            .iter_mut()
            .find(|d| d.decision_id == decision_id)
            .ok_or_else(|| OpsmeshError::NotFound(format!("decision {decision_id}")))?;
        decision.overridden = true;
        decision.outcome = Some(human_action.to_string());

        let record = OverrideRecord {
            override_id: Uuid::new_v4(),
            decision_id,
            human_action: human_action.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        };
        state.overrides.push(record.clone());
        if state.overrides.len() > MAX_OVERRIDES {
            let excess = state.overrides.len() - MAX_OVERRIDES;
            state.overrides.drain(..excess);
        }
        self.persist(&state);
        Ok(record)
    }

    /// Up to `n` past decisions whose task shares whitespace-separated
    /// tokens with `task`, best overlap first; ties keep insertion order.
    pub async fn relevant_examples(&self, task: &str, n: usize) -> Vec<DecisionRecord> {
        let query: Vec<String> = tokenize(task);
        let state = self.state.read().await;
        let mut scored: Vec<(usize, &DecisionRecord)> = state
            .decisions
            .iter()
            .map(|d| {
                let tokens = tokenize(&d.task);
                let overlap = query.iter().filter(|t| tokens.contains(t)).count();
                (overlap, d)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(n).map(|(_, d)| d.clone()).collect()
    }

    /// Retained decision count.
    pub async fn total_decisions(&self) -> usize {
        self.state.read().await.decisions.len()
    }

    /// Recomputes aggregate stats over the retained window.
    pub async fn performance_stats(&self) -> PerformanceStats {
        let state = self.state.read().await;
        let total_decisions = state.decisions.len();
        let total_overrides = state.overrides.len();
        let override_rate_percent = if total_decisions == 0 {
            0.0
        } else {
            total_overrides as f64 / total_decisions as f64 * 100.0
        };
        let average_confidence = if total_decisions == 0 {
            0.0
        } else {
            state.decisions.iter().map(|d| d.decision.confidence).sum::<f64>()
                / total_decisions as f64
        };
        PerformanceStats {
            total_decisions,
            total_overrides,
            override_rate_percent,
            average_confidence,
        }
    }

    fn persist(&self, state: &State) {
        let Some(path) = &self.path else { return };
        match serde_json::to_vec_pretty(state) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(path, bytes) {
                    warn!(agent = %self.agent, path = %path.display(), error = %e,
                        "failed to persist learning file");
                }
            }
            Err(e) => {
                warn!(agent = %self.agent, error = %e, "failed to serialize learning state");
            }
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}
