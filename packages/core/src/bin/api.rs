//! HTTP API entrypoint: boots the store pool, JWT service, metrics
//! registry, and an in-process scheduler, then serves the axum router
//! until SIGTERM/SIGINT.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ordinaut_core::api::{build_app, AppState};
use ordinaut_core::auth::JwtService;
use ordinaut_core::metrics::Metrics;
use ordinaut_core::scheduler::Scheduler;
use ordinaut_core::Config;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ordinaut_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations").run(&pool).await.context("failed to run migrations")?;

    let jwt = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));
    let metrics = Arc::new(Metrics::new());

    let (scheduler, scheduler_handle) = Scheduler::new(pool.clone());
    let shutdown = CancellationToken::new();

    let scheduler_task = tokio::spawn(scheduler.run(shutdown.child_token()));

    let state = AppState { db_pool: pool, jwt, scheduler: scheduler_handle, metrics };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "ordinaut-api listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_termination().await;
            server_shutdown.cancel();
        })
        .await
        .context("http server error")?;

    let _ = scheduler_task.await;
    Ok(())
}

async fn wait_for_termination() {
    let ctrl_c = async { tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler") };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
