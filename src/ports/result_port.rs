//! Append-only persistence of JSON result payloads.

use crate::domain::error::QuantError;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub const DEFAULT_TABLE: &str = "quant_results";

/// A payload as it was written, with its write time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub table: String,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}

impl ResultRecord {
    pub fn new(table: &str, payload: Value) -> Self {
        Self {
            table: table.to_string(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Seconds since the Unix epoch, with sub-second precision.
    pub fn epoch_seconds(&self) -> f64 {
        self.timestamp.timestamp_micros() as f64 / 1_000_000.0
    }
}

pub trait ResultSink: Send + Sync {
    /// Append `payload` to `table` (or [`DEFAULT_TABLE`]), creating the table on demand.
    fn log_result(&self, payload: &Value, table: Option<&str>) -> Result<ResultRecord, QuantError>;
}

/// Accept only plain SQL identifiers: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_table_name<'a>(section: &str, name: &'a str) -> Result<&'a str, QuantError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(name)
    } else {
        Err(QuantError::ConfigInvalid {
            section: section.to_string(),
            key: "table".into(),
            reason: format!("{name:?} is not a valid table name"),
        })
    }
}
