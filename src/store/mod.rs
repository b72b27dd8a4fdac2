// Row-level persistence. Every function takes a connection so callers decide
// whether it runs inside a transaction (`&mut *tx`) or on a pooled connection.

pub mod applicants;
pub mod certificates;
pub mod employees;
pub mod files;
pub mod history;
pub mod requests;
pub mod reviews;
pub mod services;

use std::str::FromStr;

/// Parse a TEXT column into a domain value, reporting failures as decode errors.
pub(crate) fn decode<T>(column: &str, value: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse::<T>().map_err(|e| {
        tracing::error!(column, value, "Corrupt column value");
        sqlx::Error::Decode(Box::new(e))
    })
}

pub(crate) fn decode_json(value: &str) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::from_str(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
