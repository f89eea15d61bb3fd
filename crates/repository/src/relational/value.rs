//! JSON to database value conversion.
//!
//! Conversion is driven by the column type so that bound parameters carry
//! the type the backend expects (an `INTEGER` column gets an `i32`, a
//! `TIMESTAMPTZ` column a zoned timestamp). Nulls are bound as typed nulls.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::sea_query::ColumnType;
use sea_orm::Value;
use serde_json::Value as Json;
use uuid::Uuid;

macro_rules! bind {
    ($json:expr, $ty:ty, $convert:expr) => {
        match $json {
            Json::Null => Some(Value::from(None::<$ty>)),
            json => ($convert)(json).map(|value: $ty| Value::from(value)),
        }
    };
}

/// Convert `json` for a column of `column_type`, `None` if it does not fit.
pub(crate) fn to_db_value(column_type: &ColumnType, json: &Json) -> Option<Value> {
    match column_type {
        ColumnType::TinyInteger => bind!(json, i8, |j: &Json| j.as_i64().and_then(|n| i8::try_from(n).ok())),
        ColumnType::SmallInteger => bind!(json, i16, |j: &Json| j.as_i64().and_then(|n| i16::try_from(n).ok())),
        ColumnType::Integer => bind!(json, i32, |j: &Json| j.as_i64().and_then(|n| i32::try_from(n).ok())),
        ColumnType::BigInteger => bind!(json, i64, |j: &Json| j.as_i64()),
        ColumnType::TinyUnsigned => bind!(json, u8, |j: &Json| j.as_u64().and_then(|n| u8::try_from(n).ok())),
        ColumnType::SmallUnsigned => bind!(json, u16, |j: &Json| j.as_u64().and_then(|n| u16::try_from(n).ok())),
        ColumnType::Unsigned => bind!(json, u32, |j: &Json| j.as_u64().and_then(|n| u32::try_from(n).ok())),
        ColumnType::BigUnsigned => bind!(json, u64, |j: &Json| j.as_u64()),
        ColumnType::Float => bind!(json, f32, |j: &Json| j.as_f64().map(|n| n as f32)),
        ColumnType::Double => bind!(json, f64, |j: &Json| j.as_f64()),
        ColumnType::Boolean => bind!(json, bool, |j: &Json| j.as_bool()),
        ColumnType::Char(_) | ColumnType::String(_) | ColumnType::Text => {
            bind!(json, String, |j: &Json| j.as_str().map(str::to_string))
        }
        ColumnType::Json | ColumnType::JsonBinary => bind!(json, Json, |j: &Json| Some(j.clone())),
        ColumnType::Uuid => bind!(json, Uuid, |j: &Json| j.as_str().and_then(|s| Uuid::parse_str(s).ok())),
        ColumnType::Date => bind!(json, NaiveDate, |j: &Json| j.as_str().and_then(|s| s.parse().ok())),
        ColumnType::Time => bind!(json, NaiveTime, |j: &Json| j.as_str().and_then(|s| s.parse().ok())),
        ColumnType::DateTime | ColumnType::Timestamp => {
            bind!(json, NaiveDateTime, |j: &Json| j.as_str().and_then(parse_naive_datetime))
        }
        ColumnType::TimestampWithTimeZone => bind!(json, DateTime<FixedOffset>, |j: &Json| j
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())),
        _ => by_shape(json),
    }
}

/// Human-readable name of what a column accepts, for error messages
pub(crate) fn expected(column_type: &ColumnType) -> &'static str {
    match column_type {
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger => "integer in column range",
        ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned => "unsigned integer in column range",
        ColumnType::Float | ColumnType::Double => "number",
        ColumnType::Boolean => "bool",
        ColumnType::Char(_) | ColumnType::String(_) | ColumnType::Text => "string",
        ColumnType::Uuid => "uuid string",
        ColumnType::Date => "date string (YYYY-MM-DD)",
        ColumnType::Time => "time string (HH:MM:SS)",
        ColumnType::DateTime | ColumnType::Timestamp => "datetime string",
        ColumnType::TimestampWithTimeZone => "RFC 3339 datetime string",
        _ => "scalar value",
    }
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    s.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}

/// Fallback for column types without a dedicated mapping
fn by_shape(json: &Json) -> Option<Value> {
    match json {
        Json::Null => Some(Value::from(None::<String>)),
        Json::Bool(b) => Some(Value::from(*b)),
        Json::Number(n) => n
            .as_i64()
            .map(Value::from)
            .or_else(|| n.as_u64().map(Value::from))
            .or_else(|| n.as_f64().map(Value::from)),
        Json::String(s) => Some(Value::from(s.clone())),
        Json::Array(_) | Json::Object(_) => Some(Value::from(json.clone())),
    }
}
