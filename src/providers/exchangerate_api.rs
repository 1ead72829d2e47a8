use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, instrument};

use super::util::with_retry;
use crate::core::config::ProviderConfig;
use crate::core::rates::{RateProvider, RateTable, RefreshError};

/// Client for the exchangerate-api.com v6 `latest` endpoint.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    retries: usize,
    retry_delay: Duration,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("xrate/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            retries: 0,
            retry_delay: Duration::from_millis(500),
            client,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let provider = Self::new(
            &config.base_url,
            &config.api_key,
            Duration::from_secs(config.timeout_secs),
        )?
        .with_retry(config.retries, Duration::from_millis(config.retry_delay_ms));
        Ok(provider)
    }

    pub fn with_retry(mut self, retries: usize, delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = delay;
        self
    }

    fn latest_url(&self, base: &str) -> String {
        format!("{}/v6/{}/latest/{}", self.base_url, self.api_key, base)
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    base_code: Option<String>,
    time_last_update_unix: Option<i64>,
    conversion_rates: Option<HashMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

fn unix_time(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single()
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    fn name(&self) -> &str {
        "exchangerate-api"
    }

    #[instrument(name = "ExchangeRateApiFetch", skip(self))]
    async fn fetch_latest(&self, base: &str) -> Result<RateTable, RefreshError> {
        let url = self.latest_url(base);
        debug!("Requesting latest rates from {}", self.base_url);

        let response = with_retry(|| self.client.get(&url).send(), self.retries, self.retry_delay)
            .await
            .map_err(|e| RefreshError::ProviderUnreachable(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RefreshError::ProviderUnreachable(e.without_url().to_string()))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<ErrorResponse>(&text)
                .ok()
                .and_then(|body| body.error_type)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(RefreshError::ProviderRejected {
                status: status.as_u16(),
                reason,
            });
        }

        let data: LatestRatesResponse = serde_json::from_str(&text).map_err(|e| {
            error!(error = ?e, "Failed to parse latest rates response");
            RefreshError::MalformedProviderResponse(format!("invalid JSON: {e}"))
        })?;

        if data.result != "success" {
            return Err(RefreshError::ProviderRejected {
                status: status.as_u16(),
                reason: data.error_type.unwrap_or(data.result),
            });
        }

        if let Some(code) = data.base_code.as_deref() {
            if !code.eq_ignore_ascii_case(base) {
                return Err(RefreshError::MalformedProviderResponse(format!(
                    "requested base {base}, provider returned {code}"
                )));
            }
        }

        let rates = data.conversion_rates.ok_or_else(|| {
            RefreshError::MalformedProviderResponse("missing conversion_rates".to_string())
        })?;

        let table = RateTable::new(base, rates)?
            .with_provider_updated_at(data.time_last_update_unix.and_then(unix_time));
        debug!(currencies = table.len(), "Parsed latest rates");
        Ok(table)
    }
}
