//! The opaque pipeline executor seam (§1, §4.4, §9): the core
//! invokes it with a task's payload and sees only the outcome. What a
//! pipeline actually does is out of scope for the orchestrator.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{Firing, Task};

/// Outcome of one execution attempt. The classification between
/// `Retryable` and `Terminal` is implementer policy (§4.4 names the
/// minimum: transient/network errors retryable, schema/validation errors
/// terminal); `PipelineExecutor` implementations decide it, not the core.
pub enum ExecutionOutcome {
    Success(serde_json::Value),
    Retryable(String),
    Terminal(String),
}

#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    async fn execute(&self, task: &Task, firing: &Firing, shutdown: &CancellationToken) -> ExecutionOutcome;
}

/// A no-op executor useful for tests and for standing up the scheduler
/// and API without a real pipeline backend wired in yet.
pub struct NullExecutor;

#[async_trait]
impl PipelineExecutor for NullExecutor {
    async fn execute(&self, _task: &Task, _firing: &Firing, _shutdown: &CancellationToken) -> ExecutionOutcome {
        ExecutionOutcome::Success(serde_json::json!({ "executed_by": "null-executor" }))
    }
}
