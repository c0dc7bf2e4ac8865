//! Worker pool (§4.4): leases firings from the durable store, invokes
//! the opaque pipeline executor, and records the outcome.
//!
//! Grounded on `kernel/jobs/worker.rs::JobWorker` — the claim/heartbeat/
//! graceful-shutdown shape is the same; simplified to one leased firing
//! per poll (rather than a batch) since `lease_next` is already a
//! single-row atomic claim, and parallelism comes from running several
//! worker tasks, matching §5's "N worker processes, each running M
//! parallel workers."

mod executor;

pub use executor::{ExecutionOutcome, NullExecutor, PipelineExecutor};

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::Run;
use crate::store::{due_work, runs, tasks};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub lease_duration: Duration,
    pub heartbeat_interval: StdDuration,
    /// Bounded exponential backoff applied when `lease_next` finds nothing.
    pub min_poll_interval: StdDuration,
    pub max_poll_interval: StdDuration,
    /// Delay applied when a concurrency-key conflict defers a firing.
    pub concurrency_conflict_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: format!("worker-{}", Uuid::new_v4()),
            lease_duration: Duration::seconds(60),
            heartbeat_interval: StdDuration::from_secs(20),
            min_poll_interval: StdDuration::from_millis(100),
            max_poll_interval: StdDuration::from_secs(1),
            concurrency_conflict_delay: Duration::seconds(2),
        }
    }
}

pub struct Worker {
    pool: PgPool,
    executor: Arc<dyn PipelineExecutor>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(pool: PgPool, executor: Arc<dyn PipelineExecutor>, config: WorkerConfig) -> Self {
        Self { pool, executor, config }
    }

    /// Runs the claim loop until `shutdown` is cancelled. On shutdown: stop
    /// accepting new leases, finish the current execution (if any), then
    /// return. Interrupted leases simply expire and are reclaimed by
    /// another worker (§4.4, "Graceful shutdown").
    pub async fn run(self, shutdown: CancellationToken) {
        info!(worker_id = %self.config.worker_id, "worker starting");
        let mut backoff = self.config.min_poll_interval;

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let leased = match due_work::lease_next(&self.pool, &self.config.worker_id, self.config.lease_duration).await {
                Ok(leased) => leased,
                Err(e) => {
                    error!(error = %e, "lease_next failed, backing off");
                    tokio::time::sleep(StdDuration::from_secs(1)).await;
                    continue;
                }
            };

            let Some(leased) = leased else {
                backoff = (backoff * 2).min(self.config.max_poll_interval);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                continue;
            };

            backoff = self.config.min_poll_interval;
            self.process(leased, &shutdown).await;
        }

        info!(worker_id = %self.config.worker_id, "worker stopped");
    }

    async fn process(&self, leased: due_work::LeasedFiring, shutdown: &CancellationToken) {
        let firing = leased.firing;
        let task_id = leased.task_id;

        let task = match tasks::require_by_id(&self.pool, task_id).await {
            Ok(task) => task,
            Err(e) => {
                error!(firing_id = %firing.id, task_id = %task_id, error = %e, "task vanished under a claimed firing");
                return;
            }
        };

        if let Some(key) = task.concurrency_key.as_deref().filter(|k| !k.is_empty()) {
            let run_id_placeholder = Uuid::nil();
            match runs::count_unfinished_for_concurrency_key(&self.pool, key, run_id_placeholder).await {
                Ok(count) if count > 0 => {
                    debug!(task_id = %task_id, concurrency_key = key, "deferring for concurrency conflict");
                    if let Err(e) = due_work::defer_for_concurrency_conflict(
                        &self.pool,
                        firing.id,
                        self.config.concurrency_conflict_delay,
                    )
                    .await
                    {
                        error!(firing_id = %firing.id, error = %e, "failed to defer firing");
                    }
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(task_id = %task_id, error = %e, "concurrency admission check failed");
                    return;
                }
            }
        }

        let run = Run::builder()
            .task_id(task_id)
            .firing_id(firing.id)
            .locked_by(self.config.worker_id.clone())
            .attempt(firing.attempt)
            .build();

        let run = match runs::start(&self.pool, &run).await {
            Ok(run) => run,
            Err(e) => {
                error!(firing_id = %firing.id, error = %e, "failed to record run start");
                return;
            }
        };

        let heartbeat_cancel = CancellationToken::new();
        let heartbeat_handle = {
            let pool = self.pool.clone();
            let worker_id = self.config.worker_id.clone();
            let firing_id = firing.id;
            let interval = self.config.heartbeat_interval;
            let lease_duration = self.config.lease_duration;
            let cancel = heartbeat_cancel.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            if let Ok(false) = due_work::extend_lease(&pool, firing_id, &worker_id, lease_duration).await {
                                warn!(firing_id = %firing_id, "heartbeat found lease already reclaimed");
                                break;
                            }
                        }
                    }
                }
            })
        };

        let outcome = self.executor.execute(&task, &firing, shutdown).await;
        heartbeat_cancel.cancel();
        let _ = heartbeat_handle.await;

        // If our lease was reclaimed mid-execution, another worker now owns
        // this firing; writing the run as successful would violate
        // invariant 3 (at most one successful run per firing).
        if !due_work::extend_lease(&self.pool, firing.id, &self.config.worker_id, self.config.lease_duration)
            .await
            .unwrap_or(false)
        {
            warn!(firing_id = %firing.id, "lease expired mid-execution, abandoning result");
            return;
        }

        match outcome {
            ExecutionOutcome::Success(output) => {
                if let Err(e) = runs::finish(&self.pool, run.id, true, Some(output), None).await {
                    error!(run_id = %run.id, error = %e, "failed to record successful run");
                }
                if let Err(e) = due_work::complete_success(&self.pool, firing.id).await {
                    error!(firing_id = %firing.id, error = %e, "failed to delete completed firing");
                }
            }
            ExecutionOutcome::Retryable(error) => {
                if let Err(e) = runs::finish(&self.pool, run.id, false, None, Some(error.clone())).await {
                    error!(run_id = %run.id, error = %e, "failed to record failed run");
                }

                if firing.attempt < task.max_retries {
                    if let Err(e) =
                        due_work::reschedule_for_retry(&self.pool, firing.id, firing.attempt, task.backoff_strategy).await
                    {
                        error!(firing_id = %firing.id, error = %e, "failed to reschedule retry");
                    }
                } else if let Err(e) = due_work::complete_terminal_failure(&self.pool, firing.id).await {
                    error!(firing_id = %firing.id, error = %e, "failed to delete exhausted firing");
                }
            }
            ExecutionOutcome::Terminal(error) => {
                if let Err(e) = runs::finish(&self.pool, run.id, false, None, Some(error)).await {
                    error!(run_id = %run.id, error = %e, "failed to record terminal run");
                }
                if let Err(e) = due_work::complete_terminal_failure(&self.pool, firing.id).await {
                    error!(firing_id = %firing.id, error = %e, "failed to delete firing after terminal failure");
                }
            }
        }
    }
}

/// Spawns `concurrency` independent worker loops sharing one pool and
/// executor, all cancelled together by `shutdown`.
pub async fn run_pool(
    pool: PgPool,
    executor: Arc<dyn PipelineExecutor>,
    config: WorkerConfig,
    concurrency: usize,
    shutdown: CancellationToken,
) {
    let mut handles = Vec::with_capacity(concurrency);
    for i in 0..concurrency {
        let mut worker_config = config.clone();
        worker_config.worker_id = format!("{}-{i}", config.worker_id);
        let worker = Worker::new(pool.clone(), executor.clone(), worker_config);
        let shutdown = shutdown.clone();
        handles.push(tokio::spawn(worker.run(shutdown)));
    }

    for handle in handles {
        let _ = handle.await;
    }
}
