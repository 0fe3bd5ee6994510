//! Primitive type sniffing and coercion for string fields.
//!
//! Classification works on trimmed values. A column is profiled by counting
//! per-value kinds; empty values never disqualify a kind.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Time,
    DateTime,
    /// Column values of incompatible kinds.
    Mixed,
    /// Only empty values.
    Empty,
    /// Only `none`/`null` (and empty) values.
    None,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::DateTime => "datetime",
            DataType::Mixed => "mixed",
            DataType::Empty => "empty",
            DataType::None => "none",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A field coerced to its column's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Empty,
    Null,
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%Y-%d-%m", "%Y/%d/%m", "%Y.%d.%m", "%Y%d%m",
    "%m-%d-%Y", "%m/%d/%Y", "%m.%d.%Y", "%m%d%Y",
];

const TIME_FORMATS: &[&str] = &[
    "%H:%M:%S",
    "%H:%M:%S%.f",
    "%H:%M",
    "%H%M",
    "%H%M%S",
    "%I:%M:%S%.f %p",
    "%I:%M:%S %p",
    "%I:%M %p",
    "%I:%M:%S%p",
    "%I:%M%p",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%Y.%m.%dT%H:%M:%S%.f",
    "%Y-%d-%mT%H:%M:%S%.f",
    "%Y/%d/%mT%H:%M:%S%.f",
    "%Y.%d.%mT%H:%M:%S%.f",
    "%m-%d-%YT%H:%M:%S%.f",
    "%m/%d/%YT%H:%M:%S%.f",
    "%m.%d.%YT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y%m%d%H%M%S",
    "%Y%d%m%H%M%S",
    "%m%d%Y%H%M%S",
];

struct Patterns {
    int: Regex,
    float: Regex,
    date: [Regex; 2],
    time: [Regex; 3],
    datetime: [Regex; 2],
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("valid pattern");
        Patterns {
            int: re(r"^[-+]?\d+$"),
            float: re(r"^[-+]?(\d+)?\.(\d+)?$"),
            date: [
                re(r"^\d{4}[-/.]?\d{2}[-/.]?\d{2}$"),
                re(r"^\d{2}[-/.]?\d{2}[-/.]?\d{4}$"),
            ],
            time: [
                re(r"^\d{1,2}:\d{2}(:\d{2}(\.\d+)?)?$"),
                re(r"^\d{1,2}:\d{2}(:\d{2}(\.\d+)?)?\s*(AM|PM|am|pm)$"),
                re(r"^\d{2}\d{2}(\d{2})?$"),
            ],
            datetime: [
                re(r"^\d{4}[-/.]?\d{2}[-/.]?\d{2}T?\d{2}:?\d{2}(:?\d{2}(\.\d+)?)?$"),
                re(r"^\d{2}[-/.]?\d{2}[-/.]?\d{4}T?\d{2}:?\d{2}(:?\d{2}(\.\d+)?)?$"),
            ],
        }
    })
}

fn parse_date(v: &str) -> Option<NaiveDate> {
    if !patterns().date.iter().any(|re| re.is_match(v)) {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(v, f).ok())
}

fn parse_time(v: &str) -> Option<NaiveTime> {
    if !patterns().time.iter().any(|re| re.is_match(v)) {
        return None;
    }
    TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(v, f).ok())
}

fn parse_datetime(v: &str) -> Option<NaiveDateTime> {
    if !patterns().datetime.iter().any(|re| re.is_match(v)) {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(v, f).ok())
}

fn parse_bool(v: &str) -> Option<bool> {
    if v.eq_ignore_ascii_case("true") {
        Some(true)
    } else if v.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn is_none_like(v: &str) -> bool {
    v.eq_ignore_ascii_case("none") || v.eq_ignore_ascii_case("null")
}

/// Kind of a single value.
///
/// Checked in order: none, boolean, datetime, time, date, integer, float,
/// empty, string. Compact digit runs such as `1430` therefore read as times.
pub fn infer_type(value: &str) -> DataType {
    let v = value.trim();
    if is_none_like(v) {
        DataType::None
    } else if parse_bool(v).is_some() {
        DataType::Boolean
    } else if parse_datetime(v).is_some() {
        DataType::DateTime
    } else if parse_time(v).is_some() {
        DataType::Time
    } else if parse_date(v).is_some() {
        DataType::Date
    } else if patterns().int.is_match(v) {
        DataType::Integer
    } else if patterns().float.is_match(v) && v != "." {
        DataType::Float
    } else if v.is_empty() {
        DataType::Empty
    } else {
        DataType::String
    }
}

/// Single kind able to represent every value, `Mixed` if there is none.
pub fn profile_values<'a, I>(values: I) -> DataType
where
    I: IntoIterator<Item = &'a str>,
{
    #[derive(Default)]
    struct Counts {
        total: usize,
        empty: usize,
        none: usize,
        boolean: usize,
        date: usize,
        time: usize,
        datetime: usize,
        integer: usize,
        float: usize,
        string: usize,
    }

    let mut c = Counts::default();
    for value in values {
        c.total += 1;
        match infer_type(value) {
            DataType::Empty => c.empty += 1,
            DataType::None => c.none += 1,
            DataType::Boolean => c.boolean += 1,
            DataType::Date => c.date += 1,
            DataType::Time => c.time += 1,
            DataType::DateTime => c.datetime += 1,
            DataType::Integer => c.integer += 1,
            DataType::Float => c.float += 1,
            DataType::String | DataType::Mixed => c.string += 1,
        }
    }

    let n = c.total;
    if c.empty == n {
        DataType::Empty
    } else if c.none == n || c.none + c.empty == n {
        DataType::None
    } else if c.boolean + c.empty == n {
        DataType::Boolean
    } else if c.date + c.empty == n {
        DataType::Date
    } else if c.datetime + c.empty == n {
        DataType::DateTime
    } else if c.time + c.empty == n {
        DataType::Time
    } else if c.integer + c.empty == n {
        DataType::Integer
    } else if c.float + c.integer + c.empty == n {
        DataType::Float
    } else if c.string + c.empty == n {
        DataType::String
    } else {
        DataType::Mixed
    }
}

/// Converts `value` to `kind`. Blank values become `Empty`, `none`/`null`
/// become `Null`; anything that fails to parse is kept as a string.
pub fn coerce(kind: DataType, value: &str) -> TypedValue {
    let v = value.trim();
    if v.is_empty() {
        return TypedValue::Empty;
    }
    if is_none_like(v) {
        return TypedValue::Null;
    }
    let parsed = match kind {
        DataType::Integer => v.parse().ok().map(TypedValue::Integer),
        DataType::Float => v.parse().ok().map(TypedValue::Float),
        DataType::Boolean => parse_bool(v).map(TypedValue::Boolean),
        DataType::Date => parse_date(v).map(TypedValue::Date),
        DataType::Time => parse_time(v).map(TypedValue::Time),
        DataType::DateTime => parse_datetime(v).map(TypedValue::DateTime),
        DataType::String | DataType::Mixed | DataType::Empty | DataType::None => None,
    };
    parsed.unwrap_or_else(|| TypedValue::String(value.to_string()))
}

/// Column classification used by the typed model.
pub trait TypeInference {
    fn profile(&self, values: &[&str]) -> DataType;

    fn coerce(&self, kind: DataType, value: &str) -> TypedValue;
}

/// Regex/chrono based inference.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueProfiler;

impl TypeInference for ValueProfiler {
    fn profile(&self, values: &[&str]) -> DataType {
        profile_values(values.iter().copied())
    }

    fn coerce(&self, kind: DataType, value: &str) -> TypedValue {
        coerce(kind, value)
    }
}
