//! Worker pool process entrypoint: leases firings and hands them to a
//! `PipelineExecutor`. Ships with `NullExecutor` as a placeholder — a real
//! deployment supplies its own executor (§1, §4.4, §9: pipeline
//! execution is deliberately outside this crate's scope).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use ordinaut_core::worker::{run_pool, NullExecutor, WorkerConfig};
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
        .max_connections(config.worker_concurrency as u32 + 2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let worker_config = WorkerConfig {
        lease_duration: chrono::Duration::seconds(config.lease_duration_secs),
        min_poll_interval: Duration::from_millis(config.worker_poll_interval_ms),
        ..WorkerConfig::default()
    };

    let shutdown = CancellationToken::new();
    let run_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_termination().await;
        run_shutdown.cancel();
    });

    tracing::info!(concurrency = config.worker_concurrency, "ordinaut-worker starting");
    run_pool(pool, Arc::new(NullExecutor), worker_config, config.worker_concurrency, shutdown).await;
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
}
