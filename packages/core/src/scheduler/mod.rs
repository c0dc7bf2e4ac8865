//! Scheduler loop (§4.3): maintains exactly one armed timer per
//! active task and turns timer fires into `due_work` inserts.
//!
//! Modeled as a small actor: a command channel (for task CRUD
//! notifications) paired with a min-heap of armed timers, following the
//! same `tokio::select!`-driven event loop shape used by
//! `kernel/jobs/worker.rs::Service::run`.

mod lag;
mod registry;

pub use lag::measure_lag;
pub use registry::{SchedulerCommand, SchedulerHandle};

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tokio::time::Instant as TokioInstant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{ScheduleKind, TaskStatus};
use crate::schedule;
use crate::store::{due_work, tasks};

struct ArmedTimer {
    fire_at: chrono::DateTime<Utc>,
    task_id: Uuid,
    kind: ScheduleKind,
    expr: String,
    zone: chrono_tz::Tz,
}

pub struct Scheduler {
    pool: PgPool,
    rx: mpsc::Receiver<SchedulerCommand>,
    heap: BinaryHeap<Reverse<(chrono::DateTime<Utc>, Uuid)>>,
    timers: std::collections::HashMap<Uuid, ArmedTimer>,
}

impl Scheduler {
    /// Builds the scheduler and a handle used by the API layer to notify it
    /// of task CRUD so timers re-arm without a restart.
    pub fn new(pool: PgPool) -> (Self, SchedulerHandle) {
        let (tx, rx) = mpsc::channel(256);
        let scheduler = Self { pool, rx, heap: BinaryHeap::new(), timers: std::collections::HashMap::new() };
        (scheduler, SchedulerHandle::new(tx))
    }

    /// Step 1 of the loop: load every active task and arm its timer.
    async fn load_all(&mut self) {
        let active = match tasks::list_active(&self.pool).await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!(error = %e, "failed to load active tasks on scheduler startup");
                return;
            }
        };

        info!(count = active.len(), "arming timers for active tasks");
        let now = Utc::now();
        for task in active {
            if !task.schedule_kind.uses_timer() {
                continue;
            }
            let Some(expr) = task.schedule_expr.clone() else { continue };
            let Ok(zone) = task.timezone.parse::<chrono_tz::Tz>() else { continue };
            self.arm(task.id, task.schedule_kind, expr, zone, now);
        }
    }

    fn arm(
        &mut self,
        task_id: Uuid,
        kind: ScheduleKind,
        expr: String,
        zone: chrono_tz::Tz,
        ref_instant: chrono::DateTime<Utc>,
    ) {
        match schedule::next_after(kind, &expr, zone, ref_instant) {
            Ok(Some(next)) => {
                self.heap.push(Reverse((next, task_id)));
                self.timers.insert(task_id, ArmedTimer { fire_at: next, task_id, kind, expr, zone });
            }
            Ok(None) => {
                debug!(task_id = %task_id, "schedule has no future occurrence, not arming");
                self.timers.remove(&task_id);
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "failed to compute next occurrence, not arming");
                self.timers.remove(&task_id);
            }
        }
    }

    fn disarm(&mut self, task_id: Uuid) {
        // Lazily dropped from the heap on pop (see `run`'s staleness check);
        // removing from the lookup table is enough to make pops no-ops.
        self.timers.remove(&task_id);
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        self.load_all().await;

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let sleep_until = self
                .heap
                .peek()
                .map(|Reverse((fire_at, _))| *fire_at)
                .unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(30));

            let delay = (sleep_until - Utc::now()).to_std().unwrap_or(std::time::Duration::ZERO);
            let deadline = TokioInstant::now() + delay;

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep_until(deadline) => {
                    self.fire_due_timers().await;
                }
                Some(cmd) = self.rx.recv() => {
                    self.handle_command(cmd).await;
                }
            }
        }

        info!("scheduler stopped");
    }

    async fn fire_due_timers(&mut self) {
        let now = Utc::now();
        while let Some(Reverse((fire_at, task_id))) = self.heap.peek().copied() {
            if fire_at > now {
                break;
            }
            self.heap.pop();

            let Some(timer) = self.timers.get(&task_id) else {
                continue; // disarmed since being pushed
            };
            if timer.fire_at != fire_at {
                continue; // stale entry superseded by a re-arm
            }

            let (kind, expr, zone) = (timer.kind, timer.expr.clone(), timer.zone);

            match due_work::enqueue(&self.pool, task_id, fire_at, None, None).await {
                Ok(_) => debug!(task_id = %task_id, run_at = %fire_at, "enqueued firing"),
                Err(e) => error!(task_id = %task_id, error = %e, "failed to enqueue firing"),
            }

            if kind.is_recurring() {
                self.arm(task_id, kind, expr, zone, fire_at);
            } else {
                self.timers.remove(&task_id);
            }
        }
    }

    async fn handle_command(&mut self, cmd: SchedulerCommand) {
        match cmd {
            SchedulerCommand::ArmTask(task_id) => self.rearm_from_store(task_id).await,
            SchedulerCommand::DisarmTask(task_id) => self.disarm(task_id),
            SchedulerCommand::RunNow(task_id) => {
                if let Err(e) = due_work::enqueue(&self.pool, task_id, Utc::now(), None, None).await {
                    error!(task_id = %task_id, error = %e, "runNow enqueue failed");
                }
            }
        }
    }

    async fn rearm_from_store(&mut self, task_id: Uuid) {
        self.disarm(task_id);
        match tasks::find_by_id(&self.pool, task_id).await {
            Ok(Some(task)) if task.status == TaskStatus::Active && task.schedule_kind.uses_timer() => {
                if let (Some(expr), Ok(zone)) =
                    (task.schedule_expr.clone(), task.timezone.parse::<chrono_tz::Tz>())
                {
                    self.arm(task_id, task.schedule_kind, expr, zone, Utc::now());
                }
            }
            Ok(_) => {}
            Err(e) => error!(task_id = %task_id, error = %e, "failed to reload task for re-arm"),
        }
    }
}
