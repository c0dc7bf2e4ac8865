//! Ordinaut core: a durable, multi-tenant task orchestrator combining a
//! cron/RRULE/event scheduler with a lease-based work queue and a task
//! lifecycle state machine. This crate is consumed by the `ordinaut-api`,
//! `ordinaut-scheduler`, and `ordinaut-worker` binaries plus `ordinautctl`.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod schedule;
pub mod scheduler;
pub mod store;
pub mod worker;

pub use config::Config;
pub use error::OrdinautError;
