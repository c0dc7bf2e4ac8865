//! Shared test infrastructure, grounded on
//! `tests/common/harness.rs::SharedTestInfra` — one Postgres container for
//! the whole test binary, migrations run once, a fresh pool per test.

use anyhow::{Context, Result};
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct SharedInfra {
    db_url: String,
    _container: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedInfra> = OnceCell::const_new();

impl SharedInfra {
    async fn init() -> Result<Self> {
        let container = Postgres::default().start().await.context("failed to start postgres container")?;
        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432).await?;
        let db_url = format!("postgres://postgres:postgres@{host}:{port}/postgres");

        let pool = PgPool::connect(&db_url).await.context("failed to connect for migrations")?;
        sqlx::migrate!("./migrations").run(&pool).await.context("failed to run migrations")?;
        pool.close().await;

        Ok(Self { db_url, _container: container })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA.get_or_init(|| async { Self::init().await.expect("failed to init shared test infra") }).await
    }
}

/// A fresh connection pool against the shared, migrated test database.
pub async fn pool() -> PgPool {
    let infra = SharedInfra::get().await;
    PgPool::connect(&infra.db_url).await.expect("failed to connect to test database")
}

/// Inserts and returns a ready-to-use agent with the given scopes.
pub async fn seed_agent(pool: &PgPool, scopes: &[&str]) -> ordinaut_core::domain::Agent {
    let agent = ordinaut_core::domain::Agent::builder()
        .name(format!("test-agent-{}", uuid::Uuid::new_v4()))
        .scopes(scopes.iter().map(|s| s.to_string()).collect::<Vec<_>>())
        .build();
    ordinaut_core::store::agents::insert(pool, &agent).await.expect("failed to seed agent")
}

/// Inserts and returns a minimal active cron task owned by `created_by`.
pub async fn seed_cron_task(pool: &PgPool, created_by: uuid::Uuid, cron_expr: &str) -> ordinaut_core::domain::Task {
    let task = ordinaut_core::domain::Task::builder()
        .title("test task")
        .created_by(created_by)
        .schedule_kind(ordinaut_core::domain::ScheduleKind::Cron)
        .schedule_expr(cron_expr)
        .pipeline(serde_json::json!({}))
        .build();
    ordinaut_core::store::tasks::insert(pool, &task).await.expect("failed to seed task")
}
