//! Conversion arithmetic and the number parsing/formatting used at the HTTP boundary.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConversionError {
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("Invalid number format: {0}")]
    InvalidAmount(String),
}

fn parse_number(text: &str) -> Result<f64, ConversionError> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ConversionError::InvalidAmount(trimmed.to_string())),
    }
}

/// Parses a user supplied amount. Sign is not restricted.
pub fn parse_amount(text: &str) -> Result<f64, ConversionError> {
    parse_number(text)
}

/// Parses a user supplied manual rate.
pub fn parse_rate(text: &str) -> Result<f64, ConversionError> {
    parse_number(text)
}

/// Converts `amount` between two currencies quoted against the same base.
pub fn cross_rate(amount: f64, from_rate: f64, to_rate: f64) -> Result<f64, ConversionError> {
    let result = amount * (to_rate / from_rate);
    if result.is_finite() {
        Ok(result)
    } else {
        Err(ConversionError::InvalidAmount(amount.to_string()))
    }
}

/// Formats a monetary value the way responses present it.
pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

/// Result of converting with a caller supplied rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManualConversion {
    pub amount: f64,
    pub rate: f64,
    pub result: f64,
}

impl ManualConversion {
    pub fn new(amount: f64, rate: f64) -> Result<Self, ConversionError> {
        let result = amount * rate;
        if !result.is_finite() {
            return Err(ConversionError::InvalidAmount(amount.to_string()));
        }
        Ok(Self {
            amount,
            rate,
            result,
        })
    }
}

impl fmt::Display for ManualConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} * {:.4} = {:.2}",
            self.amount, self.rate, self.result
        )
    }
}
