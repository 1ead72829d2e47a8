//! Process-wide exchange rate cache.
//!
//! Readers take a point-in-time snapshot of the current [`RateTable`]; the refresh
//! path builds a complete new table off-lock and swaps it in. Nobody ever sees a
//! table that is half old and half new.

use crate::core::conversion::{ConversionError, cross_rate};
use crate::core::rates::{RateProvider, RateTable, RefreshError, normalize_code};
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// Whether the cache has ever loaded a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Populated,
}

/// Summary of a successful refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome {
    pub currencies: usize,
    pub fetched_at: DateTime<Utc>,
    /// When the provider last published these rates, if it says.
    pub provider_updated_at: Option<DateTime<Utc>>,
}

pub struct RateCache {
    provider: Arc<dyn RateProvider>,
    base_currency: String,
    fetch_timeout: Duration,
    table: RwLock<Option<Arc<RateTable>>>,
    refresh_lock: Mutex<()>,
}

impl RateCache {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        base_currency: &str,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            base_currency: normalize_code(base_currency),
            fetch_timeout,
            table: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    /// Fetches the latest rates and replaces the whole table on success.
    ///
    /// On failure the current table is left untouched. Concurrent calls are
    /// serialized; readers are never blocked by a refresh in flight.
    #[instrument(name = "RateRefresh", skip(self), fields(provider = %self.provider.name()))]
    pub async fn refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let _guard = self.refresh_lock.lock().await;

        let fetch = self.provider.fetch_latest(&self.base_currency);
        let table = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(RefreshError::ProviderUnreachable(format!(
                    "no response within {}s",
                    self.fetch_timeout.as_secs_f64()
                )));
            }
        };

        if table.base() != self.base_currency {
            return Err(RefreshError::MalformedProviderResponse(format!(
                "expected rates against {}, got {}",
                self.base_currency,
                table.base()
            )));
        }

        let outcome = RefreshOutcome {
            currencies: table.len(),
            fetched_at: table.fetched_at(),
            provider_updated_at: table.provider_updated_at(),
        };
        self.replace(table);
        Ok(outcome)
    }

    fn replace(&self, table: RateTable) {
        let table = Arc::new(table);
        let mut current = self.table.write().unwrap_or_else(PoisonError::into_inner);
        *current = Some(table);
    }

    /// Current table, or `None` before the first successful refresh.
    pub fn snapshot(&self) -> Option<Arc<RateTable>> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> CacheState {
        match self.snapshot() {
            Some(_) => CacheState::Populated,
            None => CacheState::Empty,
        }
    }

    /// Rate of `code` relative to the base currency.
    pub fn get(&self, code: &str) -> Option<f64> {
        let code = normalize_code(code);
        let rate = self.snapshot().and_then(|table| table.rate(&code));
        if rate.is_none() {
            debug!(%code, "Rate not found");
        }
        rate
    }

    /// Known currency codes in lexicographic order.
    pub fn list_codes(&self) -> Vec<String> {
        self.snapshot()
            .map(|table| table.codes())
            .unwrap_or_default()
    }

    /// Converts `amount` from one currency to another through the base currency.
    ///
    /// Both rates are read from the same snapshot.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64, ConversionError> {
        if !amount.is_finite() {
            return Err(ConversionError::InvalidAmount(amount.to_string()));
        }

        let from = normalize_code(from);
        let to = normalize_code(to);
        let table = self.snapshot();
        let lookup = |code: &str| {
            table
                .as_ref()
                .and_then(|t| t.rate(code))
                .ok_or_else(|| ConversionError::InvalidCurrency(code.to_string()))
        };

        let from_rate = lookup(&from)?;
        let to_rate = lookup(&to)?;
        cross_rate(amount, from_rate, to_rate)
    }
}
