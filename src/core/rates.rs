//! Exchange rate data model and the upstream provider abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Why a refresh attempt did not produce a new table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RefreshError {
    /// Transport failure or timeout while talking to the provider.
    #[error("Rate provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// Provider answered, but refused the request.
    #[error("Rate provider rejected request ({status}): {reason}")]
    ProviderRejected { status: u16, reason: String },

    /// Provider answered with a payload we cannot load.
    #[error("Malformed provider response: {0}")]
    MalformedProviderResponse(String),
}

/// Returns the canonical form of a currency code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn is_valid_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic())
}

/// A complete set of rates quoted against one base currency.
///
/// Tables are immutable once built. The cache swaps whole tables, it never
/// edits one in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    base: String,
    rates: HashMap<String, f64>,
    fetched_at: DateTime<Utc>,
    provider_updated_at: Option<DateTime<Utc>>,
}

impl RateTable {
    /// Validates a provider payload and builds a table from it.
    ///
    /// Any invalid entry rejects the whole payload.
    pub fn new<I, S>(base: &str, rates: I) -> Result<Self, RefreshError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let base = normalize_code(base);
        let mut table = HashMap::new();

        for (code, rate) in rates {
            let code = normalize_code(code.as_ref());
            if !is_valid_code(&code) {
                return Err(RefreshError::MalformedProviderResponse(format!(
                    "invalid currency code '{code}'"
                )));
            }
            if !rate.is_finite() || rate <= 0.0 {
                return Err(RefreshError::MalformedProviderResponse(format!(
                    "invalid rate {rate} for {code}"
                )));
            }
            if table.insert(code.clone(), rate).is_some() {
                return Err(RefreshError::MalformedProviderResponse(format!(
                    "duplicate currency code '{code}'"
                )));
            }
        }

        if table.is_empty() {
            return Err(RefreshError::MalformedProviderResponse(
                "empty rate mapping".to_string(),
            ));
        }
        if !table.contains_key(&base) {
            return Err(RefreshError::MalformedProviderResponse(format!(
                "base currency {base} missing from rate mapping"
            )));
        }

        Ok(Self {
            base,
            rates: table,
            fetched_at: Utc::now(),
            provider_updated_at: None,
        })
    }

    pub fn with_provider_updated_at(mut self, updated_at: Option<DateTime<Utc>>) -> Self {
        self.provider_updated_at = updated_at;
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Rate of `code` relative to the base. `code` must already be normalized.
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// All codes, sorted lexicographically.
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.rates.keys().cloned().collect();
        codes.sort();
        codes
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn provider_updated_at(&self) -> Option<DateTime<Utc>> {
        self.provider_updated_at
    }
}

/// Source of fresh rate tables.
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetches the latest rates quoted against `base`.
    async fn fetch_latest(&self, base: &str) -> Result<RateTable, RefreshError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_normalizes_and_sorts_codes() {
        let table =
            RateTable::new("usd", [("usd", 1.0), ("gbp", 0.8), ("EUR", 0.9)]).unwrap();

        assert_eq!(table.base(), "USD");
        assert_eq!(table.codes(), vec!["EUR", "GBP", "USD"]);
        assert_eq!(table.rate("GBP"), Some(0.8));
        assert_eq!(table.rate("gbp"), None);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_table_rejects_non_positive_rate() {
        let err = RateTable::new("USD", [("USD", 1.0), ("EUR", 0.0)]).unwrap_err();
        assert!(matches!(err, RefreshError::MalformedProviderResponse(_)));

        let err = RateTable::new("USD", [("USD", 1.0), ("EUR", -0.9)]).unwrap_err();
        assert!(err.to_string().contains("invalid rate"));
    }

    #[test]
    fn test_table_rejects_non_finite_rate() {
        let err = RateTable::new("USD", [("USD", 1.0), ("EUR", f64::NAN)]).unwrap_err();
        assert!(matches!(err, RefreshError::MalformedProviderResponse(_)));

        let err = RateTable::new("USD", [("USD", 1.0), ("JPY", f64::INFINITY)]).unwrap_err();
        assert!(matches!(err, RefreshError::MalformedProviderResponse(_)));
    }

    #[test]
    fn test_table_rejects_bad_codes_and_duplicates() {
        assert!(RateTable::new("USD", [("USD", 1.0), ("EURO", 0.9)]).is_err());
        assert!(RateTable::new("USD", [("USD", 1.0), ("E1R", 0.9)]).is_err());
        assert!(RateTable::new("USD", [("USD", 1.0), ("eur", 0.9), ("EUR", 0.91)]).is_err());
    }

    #[test]
    fn test_table_requires_base_and_entries() {
        let empty: [(&str, f64); 0] = [];
        assert_eq!(
            RateTable::new("USD", empty).unwrap_err(),
            RefreshError::MalformedProviderResponse("empty rate mapping".to_string())
        );
        assert!(
            RateTable::new("USD", [("EUR", 0.9)])
                .unwrap_err()
                .to_string()
                .contains("base currency USD missing")
        );
    }
}
