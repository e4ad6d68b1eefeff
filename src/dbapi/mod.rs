//! DB-API 2.0 style interface.
//!
//! A thin layer over [`Connection`](crate::Connection) modelled on the
//! Python database API: connections hand out cursors, cursors execute
//! statements with `format` style parameters and fetch rows as
//! dictionaries, tuples or lists.

mod connection;
mod cursor;
mod error;
pub mod parse;

#[cfg(test)]
mod tests;

use chrono::{DateTime, NaiveDate, Utc};

use crate::types::Value;

pub use connection::{connect, connect_with, connect_with_config, DbConnection};
pub use cursor::{Column, DbCursor, DbRow, RowFormat};
pub use error::{DbApiError, DbResult};

pub const APILEVEL: &str = "2.0";
/// Threads may share the module and connections.
pub const THREADSAFETY: u8 = 2;
pub const PARAMSTYLE: &str = "format";

/// Type code reported in cursor descriptions.
pub const TYPE_CODE_UNKNOWN: i32 = 0;

// ============================================================================
// Type constructors
// ============================================================================

/// A DATE value.
pub fn date(year: i32, month: u32, day: u32) -> DbResult<Value> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(Value::date_from)
        .ok_or_else(|| DbApiError::Data(format!("invalid date {year}-{month}-{day}")))
}

/// A TIME value holding a full timestamp.
pub fn timestamp(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
) -> DbResult<Value> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .and_then(|dt| Value::time_from(dt.and_utc()))
        .ok_or_else(|| {
            DbApiError::Data(format!(
                "invalid timestamp {year}-{month}-{day} {hour}:{minute}:{second}"
            ))
        })
}

fn from_ticks(ticks: f64) -> DbResult<DateTime<Utc>> {
    if !ticks.is_finite() {
        return Err(DbApiError::Data(format!("ticks out of range: {ticks}")));
    }
    let secs = ticks.floor();
    let nanos = ((ticks - secs) * 1e9) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
        .ok_or_else(|| DbApiError::Data(format!("ticks out of range: {ticks}")))
}

/// The DATE of a UNIX timestamp in seconds.
pub fn date_from_ticks(ticks: f64) -> DbResult<Value> {
    let dt = from_ticks(ticks)?;
    Value::date_from(dt.date_naive())
        .ok_or_else(|| DbApiError::Data(format!("ticks out of range: {ticks}")))
}

/// A UNIX timestamp in seconds as TIME.
pub fn timestamp_from_ticks(ticks: f64) -> DbResult<Value> {
    let dt = from_ticks(ticks)?;
    Value::time_from(dt).ok_or_else(|| DbApiError::Data(format!("ticks out of range: {ticks}")))
}
