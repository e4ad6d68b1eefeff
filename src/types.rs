//! NoWDB type tags and value decoding.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Serialize, Serializer};

/// Canonical time format (ISO 8601 with optional fraction).
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
/// Canonical date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ============================================================================
// Type tags
// ============================================================================

/// Type tag returned next to every field pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Nothing,
    Text,
    Date,
    Time,
    Float,
    Int,
    UInt,
    Bool,
}

impl ValueType {
    /// Map a raw tag. Unknown tags return `None`.
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(ValueType::Nothing),
            1 => Some(ValueType::Text),
            2 => Some(ValueType::Date),
            3 => Some(ValueType::Time),
            4 => Some(ValueType::Float),
            5 => Some(ValueType::Int),
            6 => Some(ValueType::UInt),
            9 => Some(ValueType::Bool),
            _ => None,
        }
    }

    #[inline]
    pub fn tag(self) -> i32 {
        match self {
            ValueType::Nothing => 0,
            ValueType::Text => 1,
            ValueType::Date => 2,
            ValueType::Time => 3,
            ValueType::Float => 4,
            ValueType::Int => 5,
            ValueType::UInt => 6,
            ValueType::Bool => 9,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Nothing => "NOTHING",
            ValueType::Text => "TEXT",
            ValueType::Date => "DATE",
            ValueType::Time => "TIME",
            ValueType::Float => "FLOAT",
            ValueType::Int => "INT",
            ValueType::UInt => "UINT",
            ValueType::Bool => "BOOL",
        }
    }
}

/// Kind of a server reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Nothing,
    Status,
    Report,
    Row,
    Cursor,
    Unknown(i32),
}

impl ResultKind {
    pub const STATUS_TAG: i32 = 0x21;
    pub const REPORT_TAG: i32 = 0x22;
    pub const ROW_TAG: i32 = 0x23;
    pub const CURSOR_TAG: i32 = 0x24;

    pub fn from_tag(tag: i32) -> Self {
        match tag {
            0 => ResultKind::Nothing,
            Self::STATUS_TAG => ResultKind::Status,
            Self::REPORT_TAG => ResultKind::Report,
            Self::ROW_TAG => ResultKind::Row,
            Self::CURSOR_TAG => ResultKind::Cursor,
            other => ResultKind::Unknown(other),
        }
    }

    pub fn tag(self) -> i32 {
        match self {
            ResultKind::Nothing => 0,
            ResultKind::Status => Self::STATUS_TAG,
            ResultKind::Report => Self::REPORT_TAG,
            ResultKind::Row => Self::ROW_TAG,
            ResultKind::Cursor => Self::CURSOR_TAG,
            ResultKind::Unknown(tag) => tag,
        }
    }

    /// Rows can be read from this kind of result.
    #[inline]
    pub fn has_rows(self) -> bool {
        matches!(self, ResultKind::Row | ResultKind::Cursor)
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultKind::Nothing => write!(f, "NOTHING"),
            ResultKind::Status => write!(f, "STATUS"),
            ResultKind::Report => write!(f, "REPORT"),
            ResultKind::Row => write!(f, "ROW"),
            ResultKind::Cursor => write!(f, "CURSOR"),
            ResultKind::Unknown(tag) => write!(f, "UNKNOWN({tag:#x})"),
        }
    }
}

/// Counters carried by a REPORT result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub affected: u64,
    pub errors: u64,
    /// Running time in microseconds.
    pub runtime: u64,
}

// ============================================================================
// Values
// ============================================================================

/// A decoded field value.
///
/// DATE and TIME hold nanoseconds since the UNIX epoch.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Date(i64),
    Time(i64),
    Float(f64),
    Int(i64),
    UInt(u64),
    Bool(bool),
}

impl Value {
    /// Check if this value is NULL.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Nothing,
            Value::Text(_) => ValueType::Text,
            Value::Date(_) => ValueType::Date,
            Value::Time(_) => ValueType::Time,
            Value::Float(_) => ValueType::Float,
            Value::Int(_) => ValueType::Int,
            Value::UInt(_) => ValueType::UInt,
            Value::Bool(_) => ValueType::Bool,
        }
    }

    /// Try to get as i64. Dates and times give their nanosecond count.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) | Value::Date(i) | Value::Time(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// DATE or TIME as a UTC timestamp.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(n) | Value::Time(n) => nanos_to_datetime(*n),
            _ => None,
        }
    }

    pub fn time_from(dt: DateTime<Utc>) -> Option<Self> {
        dt.timestamp_nanos_opt().map(Value::Time)
    }

    pub fn date_from(date: NaiveDate) -> Option<Self> {
        date.and_hms_opt(0, 0, 0)
            .and_then(|dt| dt.and_utc().timestamp_nanos_opt())
            .map(Value::Date)
    }

    /// Parse a time in [`TIME_FORMAT`], or a bare date in [`DATE_FORMAT`].
    pub fn parse_time(s: &str) -> Option<Self> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, TIME_FORMAT) {
            return Utc.from_utc_datetime(&dt).timestamp_nanos_opt().map(Value::Time);
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .ok()
            .and_then(Value::date_from)
            .map(|v| match v {
                Value::Date(n) => Value::Time(n),
                other => other,
            })
    }

    pub fn parse_date(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .ok()
            .and_then(Value::date_from)
    }
}

/// Convert NoWDB time (nanoseconds since the epoch) to a timestamp.
pub fn nanos_to_datetime(nanos: i64) -> Option<DateTime<Utc>> {
    let secs = nanos.div_euclid(NANOS_PER_SECOND);
    let sub = nanos.rem_euclid(NANOS_PER_SECOND) as u32;
    DateTime::from_timestamp(secs, sub)
}

/// Current time as NoWDB time.
pub fn now() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Date(n) => match nanos_to_datetime(*n) {
                Some(dt) => write!(f, "{}", dt.format(DATE_FORMAT)),
                None => write!(f, "{n}"),
            },
            Value::Time(n) => match nanos_to_datetime(*n) {
                Some(dt) => write!(f, "{}", dt.format(TIME_FORMAT)),
                None => write!(f, "{n}"),
            },
            Value::Float(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Date(_) | Value::Time(_) => serializer.collect_str(self),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
