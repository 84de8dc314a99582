/// Runtime configuration read from the environment
///
/// Values come from process environment variables, with `.env` support via dotenvy
/// (loaded by the binary before `AppConfig::from_env` is called).
use crate::shared::errors::{AppError, AppResult};
use std::collections::HashMap;
use std::time::Duration;

/// Delay between polls when the queue is empty. Not configurable.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub const DEFAULT_WORKER_CONCURRENCY: usize = 50;
pub const DEFAULT_RECONCILIATION_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RECONCILIATION_REQUESTS_PER_SECOND: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub worker: WorkerConfig,
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Maximum number of jobs pulled per poll
    pub concurrency: usize,
    pub poll_interval: Duration,
    /// Jobs that failed this many times stop being pulled. `None` retries forever.
    pub max_failed_attempts: Option<i32>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_WORKER_CONCURRENCY,
            poll_interval: POLL_INTERVAL,
            max_failed_attempts: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub requests_per_second: f64,
}

impl ReconciliationConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_RECONCILIATION_TIMEOUT_SECS),
            requests_per_second: DEFAULT_RECONCILIATION_REQUESTS_PER_SECOND,
        }
    }
}

impl AppConfig {
    /// Build configuration from the process environment
    pub fn from_env() -> AppResult<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Build configuration from an explicit variable map
    pub fn from_vars(vars: &HashMap<String, String>) -> AppResult<Self> {
        let database_url = required(vars, "DATABASE_URL")?;

        let worker = WorkerConfig {
            concurrency: parse_or(vars, "WORKER_CONCURRENCY", DEFAULT_WORKER_CONCURRENCY)?,
            poll_interval: POLL_INTERVAL,
            max_failed_attempts: parse_optional(vars, "WORKER_MAX_FAILED_ATTEMPTS")?,
        };

        if worker.concurrency == 0 {
            return Err(AppError::ConfigError(
                "WORKER_CONCURRENCY must be greater than zero".to_string(),
            ));
        }
        if matches!(worker.max_failed_attempts, Some(n) if n < 1) {
            return Err(AppError::ConfigError(
                "WORKER_MAX_FAILED_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let base_url = required(vars, "RECONCILIATION_BASE_URL")?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::ConfigError(format!(
                "RECONCILIATION_BASE_URL must be an http(s) URL, got '{}'",
                base_url
            )));
        }

        let requests_per_second = parse_or(
            vars,
            "RECONCILIATION_REQUESTS_PER_SECOND",
            DEFAULT_RECONCILIATION_REQUESTS_PER_SECOND,
        )?;
        if requests_per_second <= 0.0 {
            return Err(AppError::ConfigError(
                "RECONCILIATION_REQUESTS_PER_SECOND must be positive".to_string(),
            ));
        }

        let reconciliation = ReconciliationConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: vars
                .get("RECONCILIATION_API_KEY")
                .filter(|key| !key.trim().is_empty())
                .cloned(),
            timeout: Duration::from_secs(parse_or(
                vars,
                "RECONCILIATION_TIMEOUT_SECS",
                DEFAULT_RECONCILIATION_TIMEOUT_SECS,
            )?),
            requests_per_second,
        };

        Ok(Self {
            database_url,
            worker,
            reconciliation,
        })
    }
}

fn required(vars: &HashMap<String, String>, key: &str) -> AppResult<String> {
    vars.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::ConfigError(format!("{} environment variable not found", key)))
}

fn parse_or<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> AppResult<T> {
    Ok(parse_optional(vars, key)?.unwrap_or(default))
}

fn parse_optional<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
) -> AppResult<Option<T>> {
    match vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::ConfigError(format!("Invalid value for {}: '{}'", key, raw))),
        None => Ok(None),
    }
}
