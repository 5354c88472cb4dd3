//! Cell values for header-driven sheets.
//!
//! A sheet has no declared schema. The kind of every cell is inferred from
//! the stored value when it is read, and `CellValue` is the closed set of kinds
//! the adapter hands out. Clients pick checkbox or text rendering purely from
//! the variant tag (see [`Widget::for_cell`]).
//!
//! # Wire form
//!
//! | Variant   | JSON                                   |
//! |-----------|----------------------------------------|
//! | `Text`    | string                                 |
//! | `Number`  | number (whole values without fraction) |
//! | `Boolean` | `true` / `false`                       |
//! | `Date`    | RFC 3339 string, millisecond precision |
//! | `Empty`   | `""`                                   |

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Format used when a date is shown to people, including date-valued headers.
pub const DATE_DISPLAY_FORMAT: &str = "%-d/%-m/%Y";

/// Largest integer a JSON number can carry without losing precision.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A single cell of a sheet.
///
/// The serde derive is the storage form (tagged, lossless). The protocol uses
/// [`CellValue::to_json`] / [`CellValue::from_json`] instead.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    #[default]
    Empty,
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Read-time coercion of a stored cell.
    ///
    /// Dates, booleans and numbers pass through unchanged. Text is trimmed,
    /// and text that trims to nothing reads back as `Empty`.
    pub fn coerce(&self) -> CellValue {
        match self {
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(trimmed.to_string())
                }
            }
            other => other.clone(),
        }
    }

    /// Convert a protocol value into a cell.
    ///
    /// Strings holding a wire-format date become `Date`; objects and arrays
    /// are stored as their JSON text.
    pub fn from_json(value: &JsonValue) -> CellValue {
        match value {
            JsonValue::Null => CellValue::Empty,
            JsonValue::Bool(b) => CellValue::Boolean(*b),
            JsonValue::Number(n) => match n.as_f64() {
                Some(f) => CellValue::Number(f),
                None => CellValue::Text(n.to_string()),
            },
            JsonValue::String(s) if s.is_empty() => CellValue::Empty,
            JsonValue::String(s) => match parse_wire_date(s) {
                Some(date) => CellValue::Date(date),
                None => CellValue::Text(s.clone()),
            },
            other => CellValue::Text(other.to_string()),
        }
    }

    /// Convert a cell into its protocol value
    pub fn to_json(&self) -> JsonValue {
        match self {
            CellValue::Text(v) => JsonValue::String(v.clone()),
            CellValue::Number(v) => number_to_json(*v),
            CellValue::Boolean(v) => JsonValue::Bool(*v),
            CellValue::Date(v) => JsonValue::String(format_wire_date(v)),
            CellValue::Empty => JsonValue::String(String::new()),
        }
    }

    /// Text used to prefill an input for this cell. Submitted back through
    /// [`Widget::to_json`] it converts into the same cell again.
    pub fn wire_text(&self) -> String {
        match self {
            CellValue::Text(v) => v.clone(),
            CellValue::Number(v) => format_number(*v),
            CellValue::Boolean(v) => v.to_string(),
            CellValue::Date(v) => format_wire_date(v),
            CellValue::Empty => String::new(),
        }
    }

    /// Text shown in a read-only table cell
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Text(v) => v.clone(),
            CellValue::Number(v) => format_number(*v),
            CellValue::Boolean(true) => "Yes".to_string(),
            CellValue::Boolean(false) => "No".to_string(),
            CellValue::Date(v) => v.format(DATE_DISPLAY_FORMAT).to_string(),
            CellValue::Empty => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(value: DateTime<Utc>) -> Self {
        CellValue::Date(value)
    }
}

/// Canonical column name of a raw header cell.
///
/// Pure function of the cell: trimmed text, or the display form of a date.
/// Column lookups must go through [`normalize_column_name`] so both sides
/// agree on the same string.
pub fn format_header(cell: &CellValue) -> String {
    match cell {
        CellValue::Date(d) => d.format(DATE_DISPLAY_FORMAT).to_string(),
        CellValue::Text(s) => s.trim().to_string(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Boolean(b) => b.to_string(),
        CellValue::Empty => String::new(),
    }
}

/// Normalize a requested column name the same way headers are formatted
pub fn normalize_column_name(name: &str) -> &str {
    name.trim()
}

/// Render a number without a trailing `.0` for whole values
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

pub fn format_wire_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a wire-format date. Plain calendar strings such as `2024-03-01`
/// stay text; only full timestamps are recognised.
pub fn parse_wire_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if !s.contains('T') {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn number_to_json(n: f64) -> JsonValue {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        return JsonValue::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(format_number(n)))
}

/// Input widget a presentation layer should use for a cell
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Checkbox(bool),
    Text(String),
    /// Text input prefilled from a number cell
    Number(String),
}

impl Widget {
    /// Checkbox iff the table is a boolean table and the cell reads as a boolean
    pub fn for_cell(boolean_table: bool, value: &CellValue) -> Widget {
        match value {
            CellValue::Boolean(b) if boolean_table => Widget::Checkbox(*b),
            CellValue::Number(_) => Widget::Number(value.wire_text()),
            other => Widget::Text(other.wire_text()),
        }
    }

    /// Positional value submitted for this widget
    pub fn to_json(&self) -> JsonValue {
        match self {
            Widget::Checkbox(b) => JsonValue::Bool(*b),
            Widget::Text(s) => JsonValue::String(s.clone()),
            // text that no longer parses is stored as typed
            Widget::Number(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => number_to_json(n),
                _ => JsonValue::String(s.clone()),
            },
        }
    }
}
