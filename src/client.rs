//! HTTP client for the conversion service, used by the terminal front end.

use anyhow::{Context, Result, anyhow, bail};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, instrument};
use url::form_urlencoded;

use crate::core::config::ClientConfig;
use crate::core::rates::normalize_code;

pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("xrate/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.backend_url, Duration::from_secs(config.timeout_secs))
    }

    /// Currency codes known to the backend, in the order it reports them.
    #[instrument(skip(self))]
    pub async fn currencies(&self) -> Result<Vec<String>> {
        let url = format!("{}/currencies", self.base_url);
        debug!("Requesting currencies from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for URL: {}", e, url))?;
        let body = Self::read_body(response).await?;

        Ok(body
            .trim()
            .split(',')
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Converts with the backend's cached rates; returns the formatted amount.
    #[instrument(skip(self))]
    pub async fn convert(&self, amount: &str, from: &str, to: &str) -> Result<String> {
        if amount.trim().is_empty() {
            bail!("Enter an amount");
        }
        if from.trim().is_empty() || to.trim().is_empty() {
            bail!("Select both currencies");
        }
        if normalize_code(from) == normalize_code(to) {
            bail!("Select different currencies");
        }

        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("amount", amount)
            .append_pair("from", from)
            .append_pair("to", to)
            .finish();
        self.post_form("/convert", body).await
    }

    /// Converts with a caller supplied rate; returns the backend's formatted line.
    #[instrument(skip(self))]
    pub async fn manual_convert(&self, amount: &str, rate: &str) -> Result<String> {
        if amount.trim().is_empty() || rate.trim().is_empty() {
            bail!("Enter an amount and a rate");
        }

        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("amount", amount)
            .append_pair("rate", rate)
            .finish();
        self.post_form("/manual-convert", body).await
    }

    async fn post_form(&self, endpoint: &str, body: String) -> Result<String> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("Posting form to {}", url);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for URL: {}", e, url))?;
        let text = Self::read_body(response).await?;
        Ok(text.trim().to_string())
    }

    async fn read_body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            let message = text.lines().next().unwrap_or_default().trim();
            if message.is_empty() {
                bail!("Server error: {}", status);
            }
            bail!("Server error: {}", message);
        }
        Ok(text)
    }
}
