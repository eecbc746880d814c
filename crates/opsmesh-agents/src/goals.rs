//! Per-agent goal targets and observed metrics.
//!
//! Purely observational: nothing in the coordination layer changes behavior
//! based on goal attainment. Dashboards read the comparison.

use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Which side of the target counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GoalDirection {
    /// Actual >= target is met (rates, counts of good things).
    Higher,
    /// Actual <= target is met (error rates, backlogs).
    Lower,
}

/// A target for one metric of one agent.
#[derive(Debug, Clone, Serialize)]
pub struct Goal {
    /// Metric name, matching `record_metric` keys.
    pub metric: String,
    /// Target value.
    pub target: f64,
    /// Display unit for dashboards ("%", "tickets", ...).
    pub unit: String,
    /// Success direction.
    pub direction: GoalDirection,
}

/// One goal joined with its latest observation.
#[derive(Debug, Clone, Serialize)]
pub struct GoalReport {
    /// The goal.
    pub goal: Goal,
    /// Latest recorded value, if any.
    pub actual: Option<f64>,
    /// None until the metric has been recorded at least once.
    pub met: Option<bool>,
}

/// Tracks goals and latest metric values per agent key.
#[derive(Default)]
pub struct GoalTracker {
    goals: RwLock<HashMap<String, Vec<Goal>>>,
    metrics: RwLock<HashMap<String, HashMap<String, f64>>>,
}

impl GoalTracker {
    /// An empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker seeded with the stock goals for the four domain agents.
    pub async fn with_defaults() -> Self {
        let tracker = Self::new();
        for (agent, metric, target, unit, direction) in [
            ("hr", "leave_auto_approval_rate", 80.0, "%", GoalDirection::Higher),
            ("hr", "escalation_rate", 20.0, "%", GoalDirection::Lower),
            ("it", "ticket_resolution_rate", 90.0, "%", GoalDirection::Higher),
            ("it", "open_critical_tickets", 3.0, "tickets", GoalDirection::Lower),
            ("finance", "expense_auto_approval_rate", 75.0, "%", GoalDirection::Higher),
            ("finance", "budget_utilization_percent", 90.0, "%", GoalDirection::Lower),
            ("compliance", "training_completion_rate", 95.0, "%", GoalDirection::Higher),
            ("compliance", "open_violations", 5.0, "violations", GoalDirection::Lower),
        ] {
            tracker.set_goal(agent, metric, target, unit, direction).await;
        }
        tracker
    }

    /// Sets (or replaces) one goal for an agent.
    pub async fn set_goal(
        &self,
        agent: &str,
        metric: &str,
        target: f64,
        unit: &str,
        direction: GoalDirection,
    ) {
        let mut goals = self.goals.write().await;
        let list = goals.entry(agent.to_string()).or_default();
        list.retain(|g| g.metric != metric);
        list.push(Goal {
            metric: metric.to_string(),
            target,
            unit: unit.to_string(),
            direction,
        });
    }

    /// Records the latest observed value of a metric.
    pub async fn record_metric(&self, agent: &str, metric: &str, value: f64) {
        let mut metrics = self.metrics.write().await;
        metrics
            .entry(agent.to_string())
            .or_default()
            .insert(metric.to_string(), value);
    }

    /// Whether the goal is currently met; None if the goal is unknown or the
    /// metric has never been recorded.
    pub async fn is_goal_met(&self, agent: &str, metric: &str) -> Option<bool> {
        let goals = self.goals.read().await;
        let goal = goals.get(agent)?.iter().find(|g| g.metric == metric)?.clone();
        drop(goals);

        let metrics = self.metrics.read().await;
        let actual = *metrics.get(agent)?.get(metric)?;
        Some(match goal.direction {
            GoalDirection::Higher => actual >= goal.target,
            GoalDirection::Lower => actual <= goal.target,
        })
    }

    /// Every goal of one agent joined with its latest observation.
    pub async fn agent_performance(&self, agent: &str) -> Vec<GoalReport> {
        let goals = self.goals.read().await;
        let metrics = self.metrics.read().await;
        let observed = metrics.get(agent);
        goals
            .get(agent)
            .map(|list| {
                list.iter()
                    .map(|goal| {
                        let actual = observed.and_then(|m| m.get(&goal.metric)).copied();
                        let met = actual.map(|a| match goal.direction {
                            GoalDirection::Higher => a >= goal.target,
                            GoalDirection::Lower => a <= goal.target,
                        });
                        GoalReport {
                            goal: goal.clone(),
                            actual,
                            met,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Performance reports for every agent with goals.
    pub async fn all_performance(&self) -> HashMap<String, Vec<GoalReport>> {
        let agents: Vec<String> = self.goals.read().await.keys().cloned().collect();
        let mut out = HashMap::new();
        for agent in agents {
            let reports = self.agent_performance(&agent).await;
            out.insert(agent, reports);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unmeasured_goal_is_none() {
        let tracker = GoalTracker::with_defaults().await;
        assert_eq!(tracker.is_goal_met("hr", "leave_auto_approval_rate").await, None);
        assert_eq!(tracker.is_goal_met("hr", "no_such_metric").await, None);
        assert_eq!(tracker.is_goal_met("nobody", "anything").await, None);
    }

    #[tokio::test]
    async fn higher_and_lower_directions() {
        let tracker = GoalTracker::with_defaults().await;
        tracker.record_metric("hr", "leave_auto_approval_rate", 85.0).await;
        tracker.record_metric("hr", "escalation_rate", 25.0).await;

        assert_eq!(tracker.is_goal_met("hr", "leave_auto_approval_rate").await, Some(true));
        assert_eq!(tracker.is_goal_met("hr", "escalation_rate").await, Some(false));
    }

    #[tokio::test]
    async fn boundary_value_counts_as_met() {
        let tracker = GoalTracker::new();
        tracker.set_goal("it", "uptime", 99.0, "%", GoalDirection::Higher).await;
        tracker.record_metric("it", "uptime", 99.0).await;
        assert_eq!(tracker.is_goal_met("it", "uptime").await, Some(true));
    }

    #[tokio::test]
    async fn set_goal_replaces_existing_target() {
        let tracker = GoalTracker::new();
        tracker.set_goal("hr", "x", 10.0, "days", GoalDirection::Higher).await;
        tracker.set_goal("hr", "x", 20.0, "days", GoalDirection::Higher).await;
        let reports = tracker.agent_performance("hr").await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].goal.target, 20.0);
        assert_eq!(reports[0].goal.unit, "days");
    }

    #[tokio::test]
    async fn all_performance_covers_defaults() {
        let tracker = GoalTracker::with_defaults().await;
        let all = tracker.all_performance().await;
        assert_eq!(all.len(), 4);
        assert!(all.contains_key("compliance"));
        assert!(all["compliance"].iter().all(|r| r.met.is_none()));
        // seeded goals carry their display units
        assert!(all["compliance"].iter().any(|r| r.goal.unit == "violations"));
        assert!(all["hr"].iter().all(|r| r.goal.unit == "%"));
    }
}
