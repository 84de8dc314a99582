//! HTTP client for the reconciliation service
//!
//! `POST {base}/identifiers` onboards and `POST {base}/identifiers/deletion`
//! offboards. Both take a JSON array of identifiers. Requests go through a
//! client-side rate limiter and are not retried here; a failed call fails the job.

use crate::modules::reconciliation::domain::{ReconciliationClient, ReconciliationIdentifier};
use crate::shared::config::ReconciliationConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::logger::LogContext;
use async_trait::async_trait;
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SERVICE_NAME: &str = "Reconciliation";
const USER_AGENT: &str = concat!("merchant-cascade/", env!("CARGO_PKG_VERSION"));
const ONBOARD_PATH: &str = "/identifiers";
const OFFBOARD_PATH: &str = "/identifiers/deletion";

type DirectRateLimiter = GovernorRateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
    governor::middleware::NoOpMiddleware,
>;

pub struct HttpReconciliationClient {
    client: Client,
    rate_limiter: DirectRateLimiter,
    base_url: String,
}

impl HttpReconciliationClient {
    pub fn new(config: &ReconciliationConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Token {}", api_key)).map_err(|_| {
                AppError::ConfigError("RECONCILIATION_API_KEY is not a valid header".to_string())
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            rate_limiter: Self::create_rate_limiter(config.requests_per_second)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// One request per `1 / requests_per_second`, no burst
    fn create_rate_limiter(requests_per_second: f64) -> AppResult<DirectRateLimiter> {
        if requests_per_second.is_nan() || requests_per_second <= 0.0 {
            return Err(AppError::ConfigError(
                "Reconciliation rate limit must be positive".to_string(),
            ));
        }
        let period = Duration::from_secs_f64(1.0 / requests_per_second);
        let quota = Quota::with_period(period)
            .ok_or_else(|| AppError::ConfigError("Rate limit period is zero".to_string()))?
            .allow_burst(NonZeroU32::MIN);

        Ok(GovernorRateLimiter::direct(quota))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_identifiers(
        &self,
        path: &str,
        identifiers: &[ReconciliationIdentifier],
    ) -> AppResult<()> {
        if identifiers.is_empty() {
            debug!("No identifiers to send to {}, skipping request", path);
            return Ok(());
        }

        self.rate_limiter.until_ready().await;

        let url = self.endpoint(path);
        let start = Instant::now();
        debug!("POST {} with {} identifiers", url, identifiers.len());

        let response = self.client.post(&url).json(identifiers).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!("Reconciliation request to {} failed: {}", url, e);
                LogContext::api_call(SERVICE_NAME, path, "transport_error", Some(duration_ms));
                return Err(AppError::from(e));
            }
        };

        let status = response.status();
        LogContext::api_call(SERVICE_NAME, path, status.as_str(), Some(duration_ms));

        if let Err(error) = handle_response_status(status) {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Reconciliation {} returned {}: {}",
                path,
                status,
                body.chars().take(200).collect::<String>()
            );
            return Err(error);
        }

        Ok(())
    }
}

/// Map a response status to the crate's error taxonomy
fn handle_response_status(status: StatusCode) -> AppResult<()> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::TOO_MANY_REQUESTS => Err(AppError::RateLimitError(format!(
            "{} rate limit exceeded",
            SERVICE_NAME
        ))),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::Unauthorized(format!(
            "{} rejected credentials ({})",
            SERVICE_NAME, status
        ))),
        StatusCode::NOT_FOUND => Err(AppError::NotFound(format!(
            "{} endpoint not found",
            SERVICE_NAME
        ))),
        s if s.is_server_error() => Err(AppError::ExternalServiceError(format!(
            "{} service unavailable ({})",
            SERVICE_NAME, status
        ))),
        _ => Err(AppError::ApiError(format!(
            "Unexpected status code from {}: {}",
            SERVICE_NAME, status
        ))),
    }
}

#[async_trait]
impl ReconciliationClient for HttpReconciliationClient {
    async fn onboard(&self, identifiers: &[ReconciliationIdentifier]) -> AppResult<()> {
        self.post_identifiers(ONBOARD_PATH, identifiers).await
    }

    async fn offboard(&self, identifiers: &[ReconciliationIdentifier]) -> AppResult<()> {
        self.post_identifiers(OFFBOARD_PATH, identifiers).await
    }
}
