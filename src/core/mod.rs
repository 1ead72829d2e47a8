//! Core business logic: the rate table, the cache around it and conversion arithmetic

pub mod cache;
pub mod config;
pub mod conversion;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use cache::{CacheState, RateCache, RefreshOutcome};
pub use conversion::{ConversionError, ManualConversion};
pub use rates::{RateProvider, RateTable, RefreshError};
