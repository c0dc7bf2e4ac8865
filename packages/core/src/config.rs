use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub default_timezone: String,
    pub lease_duration_secs: i64,
    pub worker_concurrency: usize,
    pub worker_poll_interval_ms: u64,
    pub jwt_secret: String,
    pub jwt_issuer: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development).
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            default_timezone: env::var("DEFAULT_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
            lease_duration_secs: env::var("LEASE_DURATION_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("LEASE_DURATION_SECS must be a valid integer")?,
            worker_concurrency: env::var("WORKER_CONCURRENCY")
                .ok()
                .map(|v| v.parse().context("WORKER_CONCURRENCY must be a valid integer"))
                .transpose()?
                .unwrap_or_else(num_cpus::get),
            worker_poll_interval_ms: env::var("WORKER_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "250".to_string())
                .parse()
                .context("WORKER_POLL_INTERVAL_MS must be a valid integer")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "ordinaut".to_string()),
        })
    }
}
