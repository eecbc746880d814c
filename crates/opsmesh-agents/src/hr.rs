//! HR agent: leave processing, onboarding, policy questions, audit reports,
//! and recruiting (candidate evaluation, resume parsing).

use crate::{short_id, Agent, AgentContext};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use opsmesh_bus::EventHandler;
use opsmesh_core::{Event, EventType, OpsmeshError, OpsmeshResult};
use opsmesh_store::{
    Candidate, CandidateStatus, Employee, LeaveRequest, LeaveStatus, LeaveType,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Outcome of one leave request. `request_id` is None when the request was
/// rejected before a record was created (overlap with approved leave).
#[derive(Debug, Clone, Serialize)]
pub struct LeaveReport {
    /// Stored request id, if a record was created.
    pub request_id: Option<String>,
    /// The decision.
    pub status: LeaveStatus,
    /// Human-readable explanation.
    pub message: String,
    /// Balance left in the requested category after the decision.
    pub remaining_balance: Option<u32>,
}

/// System credentials issued at onboarding.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    /// Login derived from the email local part.
    pub username: String,
    /// One-time password to be rotated at first login.
    pub temporary_password: String,
}

/// Result of onboarding one employee.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardReport {
    /// The assigned employee id.
    pub employee_id: String,
    /// Issued credentials.
    pub credentials: Credentials,
    /// Documents generated for the new hire.
    pub documents: Vec<String>,
}

/// Answer to a policy question with matched policy areas.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyAnswer {
    /// Generated answer text.
    pub answer: String,
    /// Policy documents the question touches.
    pub related_policies: Vec<String>,
}

/// Audit-trail summary over a time window.
#[derive(Debug, Clone, Serialize)]
pub struct HrAuditReport {
    /// Entries in the window.
    pub total_actions: usize,
    /// Tally per action name.
    pub actions_by_type: std::collections::HashMap<String, usize>,
    /// Tally per acting agent.
    pub actions_by_agent: std::collections::HashMap<String, usize>,
    /// Findings from the compliance check (stale pending leave requests).
    pub compliance_issues: Vec<String>,
}

/// Scored candidate evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateEvaluation {
    /// The candidate.
    pub candidate_id: String,
    /// Final score in [0, 100] after penalties.
    pub score: f64,
    /// Resulting status, also written back to the candidate record.
    pub status: CandidateStatus,
}

/// Structured profile extracted from free-form resume text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeProfile {
    /// Candidate name.
    #[serde(default)]
    pub name: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Extracted skill keywords.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Years of experience.
    #[serde(default)]
    pub experience_years: u32,
    /// Highest education mentioned.
    #[serde(default)]
    pub education: String,
}

/// Confirmation that an exit was logged and announced.
#[derive(Debug, Clone, Serialize)]
pub struct ExitReport {
    /// The departing employee.
    pub employee_id: String,
    /// When the exit was logged.
    pub logged_at: DateTime<Utc>,
}

const CAPABILITIES: &[&str] = &[
    "process_leave_request",
    "onboard_employee",
    "answer_policy_question",
    "generate_audit_report",
    "evaluate_candidate",
    "parse_resume",
    "log_exit",
];

/// The HR domain agent.
pub struct HrAgent {
    ctx: AgentContext,
}

impl HrAgent {
    /// Routing key.
    pub const KEY: &'static str = "hr";
    const NAME: &'static str = "HR Agent";

    /// Creates the agent over its injected context.
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Decides one leave request.
    ///
    /// Order of checks: overlap with already-approved leave (rejected, no
    /// record), insufficient balance (rejected, recorded), span above the
    /// auto-approve maximum (pending, balance untouched), otherwise approved
    /// with the balance decremented by exactly the requested days.
    pub async fn process_leave_request(
        &self,
        employee_id: &str,
        leave_type: LeaveType,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: &str,
    ) -> OpsmeshResult<LeaveReport> {
        let employee = self
            .ctx
            .store
            .employee(employee_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("employee {employee_id}")))?;
        if end_date < start_date {
            return Err(OpsmeshError::Validation(format!(
                "end date {end_date} before start date {start_date}"
            )));
        }
        let days = ((end_date - start_date).num_days() + 1) as u32;

        if let Some(conflict) = self
            .ctx
            .store
            .approved_leave_conflict(employee_id, start_date, end_date)
            .await
        {
            let report = LeaveReport {
                request_id: None,
                status: LeaveStatus::Rejected,
                message: format!(
                    "overlaps approved leave {} ({} to {})",
                    conflict.request_id, conflict.start_date, conflict.end_date
                ),
                remaining_balance: None,
            };
            self.ctx
                .log_action(
                    Self::NAME,
                    "Process Leave Request",
                    serde_json::json!({"status": "Rejected", "reason": report.message}),
                    employee_id,
                )
                .await;
            return Ok(report);
        }

        let balance = employee.leave_balance.get(&leave_type).copied().unwrap_or(0);
        let (status, message, remaining) = if days > balance {
            (
                LeaveStatus::Rejected,
                format!("insufficient {leave_type} balance: {balance} days available, {days} requested"),
                Some(balance),
            )
        } else if days > self.ctx.settings.leave_auto_approve_max_days {
            (
                LeaveStatus::Pending,
                format!(
                    "{days} days exceeds the {}-day auto-approval limit; sent for manager approval",
                    self.ctx.settings.leave_auto_approve_max_days
                ),
                Some(balance),
            )
        } else {
            let remaining = self
                .ctx
                .store
                .deduct_leave_balance(employee_id, leave_type, days)
                .await?;
            (
                LeaveStatus::Approved,
                format!("approved; {remaining} {leave_type} days remaining"),
                Some(remaining),
            )
        };

        let request = LeaveRequest {
            request_id: short_id("LVE"),
            employee_id: employee_id.to_string(),
            leave_type,
            start_date,
            end_date,
            days,
            reason: reason.to_string(),
            status,
            submitted_at: Utc::now(),
            processed_at: Some(Utc::now()),
        };
        let request_id = request.request_id.clone();
        self.ctx.store.insert_leave_request(request).await;

        self.ctx
            .bus
            .publish(
                EventType::LeaveProcessed,
                serde_json::json!({
                    "request_id": request_id,
                    "employee_id": employee_id,
                    "status": status,
                    "days": days,
                }),
                Self::NAME,
            )
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Process Leave Request",
                serde_json::json!({"request_id": request_id, "status": status, "days": days}),
                employee_id,
            )
            .await;

        Ok(LeaveReport {
            request_id: Some(request_id),
            status,
            message,
            remaining_balance: remaining,
        })
    }

    /// Creates the employee record with default leave balances, issues
    /// credentials, and announces `EmployeeOnboarded` so downstream agents
    /// can provision access, payroll, and trainings.
    pub async fn onboard_employee(
        &self,
        name: &str,
        email: &str,
        department: &str,
        position: &str,
    ) -> OpsmeshResult<OnboardReport> {
        if name.trim().is_empty() || email.trim().is_empty() {
            return Err(OpsmeshError::Validation(
                "employee name and email are required".to_string(),
            ));
        }
        let employee_id = self.ctx.store.next_employee_id().await;
        let employee = Employee {
            employee_id: employee_id.clone(),
            name: name.to_string(),
            email: email.to_string(),
            department: department.to_string(),
            position: position.to_string(),
            join_date: Utc::now().date_naive(),
            leave_balance: LeaveType::default_balances(),
        };
        self.ctx.store.insert_employee(employee).await;

        let username = email.split('@').next().unwrap_or(email).to_string();
        let credentials = Credentials {
            temporary_password: format!("Welcome@{employee_id}"),
            username,
        };
        let documents = vec![
            "Offer Letter".to_string(),
            "Employee Handbook".to_string(),
            "Tax Declaration Form".to_string(),
            "ID Card Request".to_string(),
        ];

        self.ctx
            .bus
            .publish(
                EventType::EmployeeOnboarded,
                serde_json::json!({
                    "employee_id": employee_id,
                    "name": name,
                    "email": email,
                    "department": department,
                    "position": position,
                }),
                Self::NAME,
            )
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Employee Onboarding",
                serde_json::json!({"employee_id": employee_id, "department": department}),
                &employee_id,
            )
            .await;

        Ok(OnboardReport {
            employee_id,
            credentials,
            documents,
        })
    }

    /// Answers a policy question and tags which policy documents it touches.
    pub async fn answer_policy_question(&self, question: &str) -> PolicyAnswer {
        let answer = self
            .ctx
            .llm
            .generate(
                question,
                "You are an HR assistant. Answer concisely based on standard company policy.",
            )
            .await;
        let related_policies = related_policies(question);

        self.ctx
            .log_action(
                Self::NAME,
                "Answer Policy Question",
                serde_json::json!({"question": question, "related_policies": related_policies}),
                "System",
            )
            .await;

        PolicyAnswer {
            answer,
            related_policies,
        }
    }

    /// Summarizes the audit trail over a window and flags leave requests
    /// pending longer than the configured threshold.
    pub async fn generate_audit_report(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> HrAuditReport {
        let entries = self.ctx.audit.list(since, until).await;
        let mut actions_by_type = std::collections::HashMap::new();
        let mut actions_by_agent = std::collections::HashMap::new();
        for entry in &entries {
            *actions_by_type.entry(entry.action.clone()).or_insert(0) += 1;
            *actions_by_agent.entry(entry.agent.clone()).or_insert(0) += 1;
        }

        let cutoff = Utc::now() - Duration::days(self.ctx.settings.audit_pending_days_threshold);
        let mut compliance_issues = Vec::new();
        for request in self.ctx.store.leave_requests().await {
            if request.status == LeaveStatus::Pending && request.submitted_at < cutoff {
                compliance_issues.push(format!(
                    "leave request {} for {} pending since {}",
                    request.request_id,
                    request.employee_id,
                    request.submitted_at.date_naive()
                ));
            }
        }

        let report = HrAuditReport {
            total_actions: entries.len(),
            actions_by_type,
            actions_by_agent,
            compliance_issues,
        };
        self.ctx
            .log_action(
                Self::NAME,
                "Generate Audit Report",
                serde_json::json!({
                    "total_actions": report.total_actions,
                    "compliance_issues": report.compliance_issues.len(),
                }),
                "System",
            )
            .await;
        report
    }

    /// Scores a candidate against a position: skill-match percentage with a
    /// 0.7 multiplier for insufficient experience and 0.8 for insufficient
    /// education, then thresholds decide accept / review / reject. The
    /// status is written back to the candidate record.
    pub async fn evaluate_candidate(
        &self,
        candidate_id: &str,
        job_id: &str,
    ) -> OpsmeshResult<CandidateEvaluation> {
        let candidate = self
            .ctx
            .store
            .candidate(candidate_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("candidate {candidate_id}")))?;
        let job = self
            .ctx
            .store
            .job(job_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("job {job_id}")))?;

        let mut score = skill_match_percent(&candidate, &job.required_skills);
        if candidate.experience_years < job.min_experience {
            score *= 0.7;
        }
        if education_level(&candidate.education) < education_level(&job.min_education) {
            score *= 0.8;
        }

        let status = if score >= self.ctx.settings.candidate_accept_threshold {
            CandidateStatus::Accepted
        } else if score >= self.ctx.settings.candidate_review_threshold {
            CandidateStatus::PendingReview
        } else {
            CandidateStatus::Rejected
        };
        self.ctx
            .store
            .update_candidate(candidate_id, |c| c.status = status)
            .await;

        self.ctx
            .log_action(
                Self::NAME,
                "Evaluate Candidate",
                serde_json::json!({"candidate_id": candidate_id, "job_id": job_id,
                    "score": score, "status": status}),
                candidate_id,
            )
            .await;

        Ok(CandidateEvaluation {
            candidate_id: candidate_id.to_string(),
            score,
            status,
        })
    }

    /// Extracts a structured profile from resume text. Tries the LLM first;
    /// if its output is not a parseable JSON object, falls back to
    /// deterministic keyword and regex extraction.
    pub async fn parse_resume(&self, text: &str) -> ResumeProfile {
        let prompt = format!(
            "Extract a JSON object {{\"name\", \"email\", \"skills\": [], \
             \"experience_years\", \"education\"}} from this resume:\n{text}"
        );
        let raw = self
            .ctx
            .llm
            .generate_structured(&prompt, "Reply with JSON only.")
            .await;

        let profile =
            extract_json_object::<ResumeProfile>(&raw).unwrap_or_else(|| fallback_parse(text));

        self.ctx
            .log_action(
                Self::NAME,
                "Parse Resume",
                serde_json::json!({"name": profile.name, "skills": profile.skills.len()}),
                "System",
            )
            .await;
        profile
    }

    /// Logs an employee exit and announces `EmployeeOffboarded`, which
    /// triggers access revocation downstream.
    pub async fn log_exit(&self, employee_id: &str) -> OpsmeshResult<ExitReport> {
        let employee = self
            .ctx
            .store
            .employee(employee_id)
            .await
            .ok_or_else(|| OpsmeshError::NotFound(format!("employee {employee_id}")))?;

        let logged_at = Utc::now();
        self.ctx
            .bus
            .publish(
                EventType::EmployeeOffboarded,
                serde_json::json!({
                    "employee_id": employee_id,
                    "name": employee.name,
                    "department": employee.department,
                }),
                Self::NAME,
            )
            .await;
        self.ctx
            .log_action(
                Self::NAME,
                "Employee Exit Logged",
                serde_json::json!({"employee_id": employee_id}),
                employee_id,
            )
            .await;

        Ok(ExitReport {
            employee_id: employee_id.to_string(),
            logged_at,
        })
    }
}

#[async_trait]
impl EventHandler for HrAgent {
    fn handler_name(&self) -> &str {
        Self::NAME
    }

    async fn on_event(&self, _event: &Event) -> OpsmeshResult<()> {
        Ok(())
    }
}

#[async_trait]
impl Agent for HrAgent {
    fn key(&self) -> &'static str {
        Self::KEY
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> &'static [&'static str] {
        CAPABILITIES
    }

    fn subscriptions(&self) -> &'static [EventType] {
        &[]
    }

    fn ctx(&self) -> &AgentContext {
        &self.ctx
    }
}

fn skill_match_percent(candidate: &Candidate, required: &[String]) -> f64 {
    if required.is_empty() {
        return 100.0;
    }
    let have: Vec<String> = candidate
        .extracted_skills
        .iter()
        .map(|s| s.to_lowercase())
        .collect();
    let matched = required
        .iter()
        .filter(|s| have.contains(&s.to_lowercase()))
        .count();
    matched as f64 / required.len() as f64 * 100.0
}

/// Ranks education levels for requirement comparison.
fn education_level(education: &str) -> u8 {
    let e = education.to_lowercase();
    if e.contains("phd") || e.contains("doctor") {
        5
    } else if e.contains("master") {
        4
    } else if e.contains("bachelor") {
        3
    } else if e.contains("diploma") {
        2
    } else {
        1
    }
}

fn extract_json_object<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

const KNOWN_SKILLS: &[&str] = &[
    "python", "rust", "java", "javascript", "typescript", "go", "sql", "aws", "docker",
    "kubernetes", "react", "linux", "terraform", "excel", "communication", "leadership",
];

fn fallback_parse(text: &str) -> ResumeProfile {
    let lower = text.to_lowercase();

    let email = Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
        .ok()
        .and_then(|re| re.find(text).map(|m| m.as_str().to_string()))
        .unwrap_or_default();

    let experience_years = Regex::new(r"(\d+)\+?\s*(?:years?|yrs)")
        .ok()
        .and_then(|re| re.captures(&lower))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    let skills: Vec<String> = KNOWN_SKILLS
        .iter()
        .filter(|s| lower.contains(*s))
        .map(|s| (*s).to_string())
        .collect();

    let education = ["phd", "master", "bachelor", "diploma"]
        .iter()
        .find(|k| lower.contains(*k))
        .map(|k| (*k).to_string())
        .unwrap_or_default();

    let name = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.contains('@'))
        .unwrap_or("")
        .to_string();

    ResumeProfile {
        name,
        email,
        skills,
        experience_years,
        education,
    }
}

fn related_policies(question: &str) -> Vec<String> {
    let q = question.to_lowercase();
    let mut policies = Vec::new();
    for (keywords, policy) in [
        (&["leave", "vacation", "holiday"][..], "Leave Policy"),
        (&["expense", "reimburs"][..], "Expense Policy"),
        (&["security", "password", "vpn"][..], "Security Policy"),
        (&["conduct", "harass", "ethic"][..], "Code of Conduct"),
        (&["remote", "wfh", "work from home"][..], "Remote Work Policy"),
    ] {
        if keywords.iter().any(|k| q.contains(k)) {
            policies.push(policy.to_string());
        }
    }
    policies
}
