//! Durable store: the only shared mutable state (§4.2, §5). A thin
//! layer of `sqlx` queries over a Postgres pool — no ORM, no in-process
//! caching of task state.

pub mod agents;
pub mod audit;
pub mod due_work;
pub mod runs;
pub mod tasks;

pub use due_work::{EnqueueResult, LeasedFiring};
