// used for the restored calendar dates
use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

// used to hand out lexical forms without copying text cells
use std::borrow::Cow;
// used to print out readable forms of a data type
use std::fmt;

lazy_static! {
    static ref YEAR_MONTH: Regex = Regex::new(r"^(\d{4})-(\d{1,2})$").unwrap();
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// A semantic type the materializer can restore from the string-typed graph.
pub trait DataType: fmt::Display + Sized {
    // static stuff which needs to be implemented downstream
    const DATA_TYPE: &'static str;
    fn coerce(lexical: &str) -> Option<Self>;
}

// ------------- Data Types --------------
impl DataType for String {
    const DATA_TYPE: &'static str = "String";
    fn coerce(lexical: &str) -> Option<String> {
        Some(lexical.to_owned())
    }
}
impl DataType for NaiveDate {
    const DATA_TYPE: &'static str = "NaiveDate";
    fn coerce(lexical: &str) -> Option<NaiveDate> {
        parse_date(lexical)
    }
}

/// Reads a month-floored date in any of the shapes upstream tables produce:
/// `2022-01-01`, `2022-01-01 00:00:00`, `2022-01-01T00:00:00` or `2022-01`.
/// Time of day is discarded.
pub fn parse_date(lexical: &str) -> Option<NaiveDate> {
    let lexical = lexical.trim();
    if let Ok(date) = NaiveDate::parse_from_str(lexical, "%Y-%m-%d") {
        return Some(date);
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(lexical, format) {
            return Some(datetime.date());
        }
    }
    let captures = YEAR_MONTH.captures(lexical)?;
    let year = captures.get(1)?.as_str().parse::<i32>().ok()?;
    let month = captures.get(2)?.as_str().parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// A cell of an upstream canonical table, before it is reduced to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Missing,
    Text(String),
    Integer(i64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
    /// The string form stored in the fact graph; `None` for a missing cell.
    pub fn lexical(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Missing => None,
            Value::Text(s) => Some(Cow::Borrowed(s)),
            Value::Integer(i) => Some(Cow::Owned(i.to_string())),
            Value::Date(d) => Some(Cow::Owned(d.format("%Y-%m-%d").to_string())),
            Value::DateTime(d) => Some(Cow::Owned(d.format("%Y-%m-%d %H:%M:%S").to_string())),
        }
    }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.lexical() {
            Some(lexical) => write!(f, "{}", lexical),
            None => write!(f, "NA"),
        }
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}
impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}
impl From<NaiveDateTime> for Value {
    fn from(d: NaiveDateTime) -> Self {
        Value::DateTime(d)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Missing, Into::into)
    }
}

/// A cell of a materialized table: text, a restored date, or explicitly missing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cell {
    Missing,
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            _ => None,
        }
    }
}
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Missing => write!(f, "NA"),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Date(d) => write!(f, "{}", d),
        }
    }
}
