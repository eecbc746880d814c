use serde::Deserialize;

/// Policy knobs consumed by the agents and the orchestrator.
///
/// Every field is a simple numeric knob with a single documented effect.
/// All fields have serde defaults so a partial TOML table works.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Leave requests spanning more than this many days go to Pending
    /// instead of being auto-approved.
    pub leave_auto_approve_max_days: u32,
    /// Candidate score at or above which the evaluation auto-accepts.
    pub candidate_accept_threshold: f64,
    /// Candidate score at or above which (but below accept) the evaluation
    /// parks the candidate for manual review.
    pub candidate_review_threshold: f64,
    /// Expenses at or below this amount are auto-approved.
    pub expense_auto_approve_limit: f64,
    /// Decisions below this confidence are escalated instead of acted on.
    pub escalation_confidence_threshold: f64,
    /// Mandatory trainings still Scheduled this many days after their due
    /// date count as audit findings.
    pub training_overdue_days: i64,
    /// Leave requests Pending longer than this many days are flagged by the
    /// HR audit report's compliance check.
    pub audit_pending_days_threshold: i64,
    /// Budget utilization (percent) at or above which spend recording
    /// raises an alert.
    pub budget_alert_threshold_percent: f64,
    /// Maximum depth of cascading event delivery before the bus stops
    /// fanning out (the event is still logged).
    pub max_cascade_depth: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            leave_auto_approve_max_days: 10,
            candidate_accept_threshold: 50.0,
            candidate_review_threshold: 40.0,
            expense_auto_approve_limit: 5000.0,
            escalation_confidence_threshold: 0.6,
            training_overdue_days: 30,
            audit_pending_days_threshold: 7,
            budget_alert_threshold_percent: 90.0,
            max_cascade_depth: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.leave_auto_approve_max_days, 10);
        assert_eq!(s.expense_auto_approve_limit, 5000.0);
        assert_eq!(s.escalation_confidence_threshold, 0.6);
        assert_eq!(s.audit_pending_days_threshold, 7);
        assert_eq!(s.max_cascade_depth, 8);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{"expense_auto_approve_limit": 2500.0}"#).unwrap();
        assert_eq!(s.expense_auto_approve_limit, 2500.0);
        assert_eq!(s.escalation_confidence_threshold, 0.6);
    }
}
