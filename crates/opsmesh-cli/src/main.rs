//! Opsmesh command-line entry point: loads configuration, wires the four
//! domain agents onto one bus, and either runs the scripted demo or routes
//! a single task.

use clap::{Parser, Subcommand};
use opsmesh_agents::{
    wire_event_subscriptions, AgentContext, ComplianceAgent, FinanceAgent, GoalTracker, HrAgent,
    ItAgent, LearningStore,
};
use opsmesh_bus::EventBus;
use opsmesh_core::{AuditTrail, OpsmeshError, OpsmeshResult, Settings};
use opsmesh_llm::{LlmService, ProviderConfig};
use opsmesh_orchestrator::Orchestrator;
use opsmesh_store::{EntityStore, LeaveType};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "opsmesh", about = "Event-driven multi-agent coordination layer", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "opsmesh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the end-to-end demo scenario and print the dashboards.
    Demo,
    /// Route one free-form task and print the chosen agent.
    Route {
        /// The task text.
        task: String,
        /// Extra context shown to the router.
        #[arg(long, default_value = "")]
        context: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OpsmeshConfig {
    settings: Settings,
    model: Option<ProviderConfig>,
    data_dir: PathBuf,
}

impl Default for OpsmeshConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            model: None,
            data_dir: PathBuf::from("data"),
        }
    }
}

struct App {
    store: Arc<EntityStore>,
    bus: Arc<EventBus>,
    audit: Arc<AuditTrail>,
    hr: Arc<HrAgent>,
    goals: GoalTracker,
    orchestrator: Orchestrator,
}

fn load_config(path: &PathBuf) -> OpsmeshResult<OpsmeshConfig> {
    match std::fs::read_to_string(path) {
        Ok(raw) => {
            let config = toml::from_str(&raw).map_err(|e| OpsmeshError::Config(e.to_string()))?;
            info!(path = %path.display(), "loaded configuration");
            Ok(config)
        }
        Err(_) => {
            warn!(path = %path.display(), "config file not found; using defaults");
            Ok(OpsmeshConfig::default())
        }
    }
}

async fn build(config: OpsmeshConfig) -> OpsmeshResult<App> {
    std::fs::create_dir_all(&config.data_dir)?;
    let settings = config.settings;

    let store = Arc::new(EntityStore::new());
    let bus = Arc::new(EventBus::new(settings.max_cascade_depth));
    let audit = Arc::new(AuditTrail::new());
    let llm = Arc::new(LlmService::new(config.model));

    let ctx = |key: &str| AgentContext {
        store: store.clone(),
        llm: llm.clone(),
        bus: bus.clone(),
        audit: audit.clone(),
        learning: Arc::new(LearningStore::open(
            key,
            config.data_dir.join(format!("{key}_learning.json")),
        )),
        settings: settings.clone(),
    };
    let hr = Arc::new(HrAgent::new(ctx(HrAgent::KEY)));
    let it = Arc::new(ItAgent::new(ctx(ItAgent::KEY)));
    let finance = Arc::new(FinanceAgent::new(ctx(FinanceAgent::KEY)));
    let compliance = Arc::new(ComplianceAgent::new(ctx(ComplianceAgent::KEY)));
    wire_event_subscriptions(&bus, &hr, &it, &finance, &compliance).await;

    let orchestrator = Orchestrator::new(
        hr.clone(),
        it,
        finance,
        compliance,
        bus.clone(),
        llm,
        settings,
    );

    Ok(App {
        store,
        bus,
        audit,
        hr,
        goals: GoalTracker::with_defaults().await,
        orchestrator,
    })
}

async fn run_demo(app: &App) -> OpsmeshResult<()> {
    println!("== Opsmesh demo ==\n");

    println!("-> new_hire: Alice Johnson");
    let run = app
        .orchestrator
        .execute_workflow(
            "new_hire",
            serde_json::json!({
                "name": "Alice Johnson",
                "email": "alice.johnson@example.com",
                "department": "Engineering",
                "position": "Senior Developer",
            }),
        )
        .await?;
    println!("   run {} -> {:?}", run.id, run.status);

    println!("-> new_hire: Bob Garcia");
    app.orchestrator
        .execute_workflow(
            "new_hire",
            serde_json::json!({
                "name": "Bob Garcia",
                "email": "bob.garcia@example.com",
                "department": "Finance",
                "position": "Analyst",
            }),
        )
        .await?;

    println!("-> leave request for EMP001 (3 days annual)");
    let today = chrono::Utc::now().date_naive();
    let leave = app
        .hr
        .process_leave_request(
            "EMP001",
            LeaveType::Annual,
            today + chrono::Duration::days(14),
            today + chrono::Duration::days(16),
            "family trip",
        )
        .await?;
    println!("   {:?}: {}", leave.status, leave.message);

    println!("-> expense_claim: 3500 (within limit) and 15000 (over limit)");
    for amount in [3500.0, 15000.0] {
        let run = app
            .orchestrator
            .execute_workflow(
                "expense_claim",
                serde_json::json!({"employee_id": "EMP001", "amount": amount,
                    "category": "Travel", "description": "demo expense"}),
            )
            .await?;
        println!("   {} -> {}", amount, run.steps[0].result_status);
    }

    println!("-> security_incident");
    let run = app
        .orchestrator
        .execute_workflow(
            "security_incident",
            serde_json::json!({"description": "suspicious login from unknown device",
                "employee_id": "EMP001"}),
        )
        .await?;
    for step in &run.steps {
        println!("   {} ({}) -> {}", step.step_name, step.agent, step.result_status);
    }

    println!("-> dispatch: free-form task through the confidence gate");
    let outcome = app
        .orchestrator
        .dispatch("Approve a 2 day casual leave for EMP002", "")
        .await;
    println!("   {}", serde_json::to_string_pretty(&outcome)?);

    println!("-> employee_exit: EMP002");
    let run = app
        .orchestrator
        .execute_workflow("employee_exit", serde_json::json!({"employee_id": "EMP002"}))
        .await?;
    for step in &run.steps {
        println!("   {} ({}) -> {}", step.step_name, step.agent, step.result_status);
    }

    println!("\n== Dashboards ==\n");
    for status in app.orchestrator.agent_statuses().await {
        println!(
            "agent {:<10} {:<8} decisions={:<3} capabilities={}",
            status.key,
            status.status,
            status.decisions_made,
            status.capabilities.len()
        );
    }

    let escalations = app.orchestrator.escalation_queue().await;
    println!("\nescalations awaiting review: {}", escalations.len());

    let completed = app.orchestrator.completed_workflows(10).await;
    println!("completed workflows: {}", completed.len());
    for run in &completed {
        println!("  {} {} -> {:?}", run.id, run.name, run.status);
    }

    app.goals.record_metric("compliance", "open_violations", 1.0).await;
    println!("\ngoal status:");
    for (agent, reports) in app.goals.all_performance().await {
        for report in reports {
            println!(
                "  {agent}: {} target {} {} -> {:?}",
                report.goal.metric, report.goal.target, report.goal.unit, report.met
            );
        }
    }

    let events = app.bus.event_log(50).await;
    println!("\nevent log ({} events):", events.len());
    for event in &events {
        println!("  {} from {}", event.event_type, event.source);
    }

    println!("\naudit entries: {}", app.audit.len().await);
    println!("employees on record: {}", app.store.employees().await.len());
    Ok(())
}

#[tokio::main]
async fn main() -> OpsmeshResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let app = build(config).await?;

    match cli.command {
        Command::Demo => run_demo(&app).await?,
        Command::Route { task, context } => {
            let routed = app.orchestrator.route_task(&task, &context).await;
            println!("agent: {}", routed.agent_key);
            println!("reasoning: {}", routed.reasoning);
        }
    }
    Ok(())
}
