//! Strict `application/x-www-form-urlencoded` decoding.

use std::collections::HashMap;
use thiserror::Error;
use url::form_urlencoded;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FormError {
    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Malformed form field: {0}")]
    MalformedField(String),

    #[error("Duplicate form field: {0}")]
    DuplicateField(String),
}

/// Decoded form body. Every field appears at most once.
#[derive(Debug, Default)]
pub struct FormFields {
    fields: HashMap<String, String>,
}

impl FormFields {
    /// Decodes `body`, rejecting pairs without `=`, empty keys and repeated keys.
    pub fn parse(body: &str) -> Result<Self, FormError> {
        let mut fields = HashMap::new();

        for segment in body.trim_end_matches(['\r', '\n']).split('&') {
            if segment.is_empty() {
                continue;
            }
            if !segment.contains('=') {
                return Err(FormError::MalformedField(segment.to_string()));
            }

            // A segment without '&' decodes to exactly one pair.
            let Some((key, value)) = form_urlencoded::parse(segment.as_bytes()).next() else {
                return Err(FormError::MalformedField(segment.to_string()));
            };
            if key.is_empty() {
                return Err(FormError::MalformedField(segment.to_string()));
            }
            if fields.contains_key(key.as_ref()) {
                return Err(FormError::DuplicateField(key.into_owned()));
            }
            fields.insert(key.into_owned(), value.into_owned());
        }

        Ok(Self { fields })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Returns the value of `name`, treating blank values as missing.
    pub fn require(&self, name: &str) -> Result<&str, FormError> {
        match self.get(name) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(FormError::MissingField(name.to_string())),
        }
    }
}
