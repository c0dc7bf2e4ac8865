//! `ordinautctl`: an admin CLI operating directly on the store, for
//! bootstrapping agents and driving tasks without going through the HTTP
//! API. Grounded on `bin/migrate_cli.rs`'s clap-subcommand-plus-JSON-output
//! shape.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ordinaut_core::auth::JwtService;
use ordinaut_core::domain::{Agent, ScheduleKind, Task};
use ordinaut_core::store::{agents, due_work, tasks};
use ordinaut_core::{events, Config};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "ordinautctl")]
#[command(about = "Admin CLI for the Ordinaut task orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the bootstrap `system` agent and print its token.
    Bootstrap,
    /// Create an agent and issue its bearer token.
    CreateAgent {
        name: String,
        #[arg(long, value_delimiter = ',')]
        scopes: Vec<String>,
    },
    /// Create a task.
    CreateTask {
        title: String,
        #[arg(long)]
        created_by: Uuid,
        #[arg(long, value_enum)]
        kind: ScheduleKindArg,
        #[arg(long)]
        expr: Option<String>,
        #[arg(long, default_value = "UTC")]
        timezone: String,
        #[arg(long, default_value = "{}")]
        pipeline: String,
    },
    /// List tasks.
    ListTasks {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Pause a task.
    Pause { id: Uuid },
    /// Resume a paused task.
    Resume { id: Uuid },
    /// Cancel a task.
    Cancel { id: Uuid },
    /// Delete a task permanently.
    Delete { id: Uuid },
    /// Enqueue an immediate firing for a task.
    RunNow { id: Uuid },
    /// Publish an event, enqueuing firings for matching event-kind tasks.
    PublishEvent {
        topic: String,
        #[arg(long, default_value = "{}")]
        payload: String,
        #[arg(long)]
        source_agent_id: Uuid,
    },
}

#[derive(Clone, clap::ValueEnum)]
enum ScheduleKindArg {
    Cron,
    Rrule,
    Once,
    Event,
}

impl From<ScheduleKindArg> for ScheduleKind {
    fn from(value: ScheduleKindArg) -> Self {
        match value {
            ScheduleKindArg::Cron => ScheduleKind::Cron,
            ScheduleKindArg::Rrule => ScheduleKind::Rrule,
            ScheduleKindArg::Once => ScheduleKind::Once,
            ScheduleKindArg::Event => ScheduleKind::Event,
        }
    }
}

#[derive(Serialize)]
struct Output<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn print_ok<T: Serialize>(data: T) {
    println!("{}", serde_json::to_string_pretty(&Output { success: true, data: Some(data), error: None }).unwrap());
}

fn print_err(message: impl Into<String>) {
    println!(
        "{}",
        serde_json::to_string_pretty(&Output::<()> { success: false, data: None, error: Some(message.into()) })
            .unwrap()
    );
}

async fn connect(config: &Config) -> Result<PgPool> {
    PgPool::connect(&config.database_url).await.context("failed to connect to database")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let pool = connect(&config).await?;

    match cli.command {
        Commands::Bootstrap => cmd_bootstrap(&pool, &config).await,
        Commands::CreateAgent { name, scopes } => cmd_create_agent(&pool, &config, name, scopes).await,
        Commands::CreateTask { title, created_by, kind, expr, timezone, pipeline } => {
            cmd_create_task(&pool, title, created_by, kind.into(), expr, timezone, pipeline).await
        }
        Commands::ListTasks { limit } => cmd_list_tasks(&pool, limit).await,
        Commands::Pause { id } => cmd_print_task(tasks::pause(&pool, id).await),
        Commands::Resume { id } => cmd_print_task(tasks::resume(&pool, id).await),
        Commands::Cancel { id } => cmd_print_task(tasks::cancel(&pool, id).await),
        Commands::Delete { id } => cmd_delete(&pool, id).await,
        Commands::RunNow { id } => cmd_run_now(&pool, id).await,
        Commands::PublishEvent { topic, payload, source_agent_id } => {
            cmd_publish_event(&pool, topic, payload, source_agent_id).await
        }
    }
}

async fn cmd_bootstrap(pool: &PgPool, config: &Config) -> Result<()> {
    let agent = Agent::system();
    match agents::insert(pool, &agent).await {
        Ok(agent) => {
            let jwt = JwtService::new(&config.jwt_secret, config.jwt_issuer.clone());
            let token = jwt.issue(agent.id, agent.scopes.clone())?;
            print_ok(serde_json::json!({ "agent": agent, "token": token }));
        }
        Err(e) => print_err(e.to_string()),
    }
    Ok(())
}

async fn cmd_create_agent(pool: &PgPool, config: &Config, name: String, scopes: Vec<String>) -> Result<()> {
    let agent = Agent::builder().name(name).scopes(scopes).build();
    match agents::insert(pool, &agent).await {
        Ok(agent) => {
            let jwt = JwtService::new(&config.jwt_secret, config.jwt_issuer.clone());
            let token = jwt.issue(agent.id, agent.scopes.clone())?;
            print_ok(serde_json::json!({ "agent": agent, "token": token }));
        }
        Err(e) => print_err(e.to_string()),
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_create_task(
    pool: &PgPool,
    title: String,
    created_by: Uuid,
    kind: ScheduleKind,
    expr: Option<String>,
    timezone: String,
    pipeline: String,
) -> Result<()> {
    let pipeline: serde_json::Value = serde_json::from_str(&pipeline).context("--pipeline must be valid JSON")?;

    let mut task =
        Task::builder().title(title).created_by(created_by).schedule_kind(kind).timezone(timezone).pipeline(pipeline).build();
    task.schedule_expr = expr;

    match tasks::insert(pool, &task).await {
        Ok(task) => print_ok(task),
        Err(e) => print_err(e.to_string()),
    }
    Ok(())
}

async fn cmd_list_tasks(pool: &PgPool, limit: i64) -> Result<()> {
    match tasks::list(pool, None, limit, 0).await {
        Ok(tasks) => print_ok(tasks),
        Err(e) => print_err(e.to_string()),
    }
    Ok(())
}

fn cmd_print_task(result: Result<Task, ordinaut_core::OrdinautError>) -> Result<()> {
    match result {
        Ok(task) => print_ok(task),
        Err(e) => print_err(e.to_string()),
    }
    Ok(())
}

async fn cmd_delete(pool: &PgPool, id: Uuid) -> Result<()> {
    match tasks::delete(pool, id).await {
        Ok(()) => print_ok(serde_json::json!({ "deleted": id })),
        Err(e) => print_err(e.to_string()),
    }
    Ok(())
}

async fn cmd_run_now(pool: &PgPool, id: Uuid) -> Result<()> {
    match due_work::enqueue(pool, id, chrono::Utc::now(), None, None).await {
        Ok(result) => print_ok(serde_json::json!({ "enqueued": format!("{result:?}") })),
        Err(e) => print_err(e.to_string()),
    }
    Ok(())
}

async fn cmd_publish_event(pool: &PgPool, topic: String, payload: String, source_agent_id: Uuid) -> Result<()> {
    let payload: serde_json::Value = serde_json::from_str(&payload).context("--payload must be valid JSON")?;
    match events::publish(pool, &topic, payload, source_agent_id).await {
        Ok(published) => print_ok(published),
        Err(e) => print_err(e.to_string()),
    }
    Ok(())
}
