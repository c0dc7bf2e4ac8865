//! Commands the API layer sends to the running scheduler so timers track
//! task CRUD without requiring a restart (§4.3, step 3-5).

use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub enum SchedulerCommand {
    /// Task created, updated, or resumed: cancel any existing timer,
    /// reload the task, and arm a new one.
    ArmTask(Uuid),
    /// Task paused, canceled, or deleted: cancel the timer.
    DisarmTask(Uuid),
    /// `runNow`: enqueue immediately without touching the recurring timer.
    RunNow(Uuid),
}

#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub(super) fn new(tx: mpsc::Sender<SchedulerCommand>) -> Self {
        Self { tx }
    }

    pub async fn arm(&self, task_id: Uuid) {
        let _ = self.tx.send(SchedulerCommand::ArmTask(task_id)).await;
    }

    pub async fn disarm(&self, task_id: Uuid) {
        let _ = self.tx.send(SchedulerCommand::DisarmTask(task_id)).await;
    }

    pub async fn run_now(&self, task_id: Uuid) {
        let _ = self.tx.send(SchedulerCommand::RunNow(task_id)).await;
    }
}
