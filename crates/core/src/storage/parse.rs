//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::models::{Activity, OrderStatus, PaymentStatus, Role};

/// Storage format for calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn conversion_error<E>(idx: usize, e: E) -> SqlError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SqlError::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

#[derive(Debug)]
struct UnknownVariant(String);

impl std::fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown stored value '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(|e| conversion_error(0, e))
}

/// Parse an optional UUID from a database string column
pub fn parse_uuid_opt(s: Option<String>) -> Result<Option<Uuid>, SqlError> {
    s.map(|s| parse_uuid(&s)).transpose()
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(0, e))
}

/// Parse an optional DateTime from an RFC3339 string
pub fn parse_datetime_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>, SqlError> {
    s.map(|s| parse_datetime(&s)).transpose()
}

/// Parse a calendar date stored as `YYYY-MM-DD`
pub fn parse_date(s: &str) -> Result<NaiveDate, SqlError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| conversion_error(0, e))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_activity(s: &str) -> Result<Activity, SqlError> {
    Activity::from_str(s).ok_or_else(|| conversion_error(0, UnknownVariant(s.to_string())))
}

pub fn parse_payment_status(s: &str) -> Result<PaymentStatus, SqlError> {
    PaymentStatus::from_str(s).ok_or_else(|| conversion_error(0, UnknownVariant(s.to_string())))
}

pub fn parse_order_status(s: &str) -> Result<OrderStatus, SqlError> {
    OrderStatus::from_str(s).ok_or_else(|| conversion_error(0, UnknownVariant(s.to_string())))
}

/// Convert a u8 to Role
pub fn role_from_u8(value: u8) -> Role {
    match value {
        3 => Role::Admin,
        2 => Role::Manager,
        _ => Role::Customer,
    }
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
