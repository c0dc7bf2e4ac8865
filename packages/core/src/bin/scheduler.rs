//! Scheduler process entrypoint: runs the timer-registry loop that turns
//! cron/rrule/once occurrences into `due_work` rows. Runs standalone so it
//! can be scaled independently of the API and worker processes (§5).

use std::time::Duration;

use anyhow::{Context, Result};
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
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let (scheduler, _handle) = Scheduler::new(pool);
    let shutdown = CancellationToken::new();

    let run_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_termination().await;
        run_shutdown.cancel();
    });

    tracing::info!("ordinaut-scheduler starting");
    scheduler.run(shutdown).await;
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
