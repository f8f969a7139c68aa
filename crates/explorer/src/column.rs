//! Column descriptors and typed table cells.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a column's values compare when sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellKind {
    #[default]
    Text,
    Number,
    Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Ordering field sent to the API; `None` makes the header unsortable.
    pub sort_key: Option<String>,
    pub display_name: String,
    #[serde(default)]
    pub kind: CellKind,
    /// JSON pointer into an API record, e.g. `/attributes/accession`.
    #[serde(default)]
    pub source: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            sort_key: None,
            display_name: display_name.into(),
            kind: CellKind::Text,
            source: None,
        }
    }

    pub fn sortable(mut self, sort_key: impl Into<String>) -> Self {
        self.sort_key = Some(sort_key.into());
        self
    }

    pub fn kind(mut self, kind: CellKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn source(mut self, pointer: impl Into<String>) -> Self {
        self.source = Some(pointer.into());
        self
    }
}

/// A rendered table cell. Numbers and dates keep their raw text so that
/// client-side search matches what the user sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Cell {
    Empty,
    Text(String),
    Number { value: f64, raw: String },
    Date { value: NaiveDateTime, raw: String },
}

pub type Row = Vec<Cell>;

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn number(value: f64) -> Self {
        Self::Number {
            value,
            raw: value.to_string(),
        }
    }

    /// Parses `raw` as `kind`, falling back to text when it does not parse.
    pub fn parse(raw: &str, kind: CellKind) -> Self {
        if raw.is_empty() {
            return Self::Empty;
        }
        match kind {
            CellKind::Text => Self::Text(raw.to_string()),
            CellKind::Number => match raw.trim().parse::<f64>() {
                Ok(value) if !value.is_nan() => Self::Number {
                    value,
                    raw: raw.to_string(),
                },
                _ => Self::Text(raw.to_string()),
            },
            CellKind::Date => match parse_date(raw) {
                Some(value) => Self::Date {
                    value,
                    raw: raw.to_string(),
                },
                None => Self::Text(raw.to_string()),
            },
        }
    }

    /// Extracts a cell from a JSON value.
    pub fn from_json(value: &Value, kind: CellKind) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::String(text) => Self::parse(text, kind),
            Value::Number(number) => match (kind, number.as_f64()) {
                (CellKind::Text, _) | (_, None) => Self::Text(number.to_string()),
                (_, Some(value)) => Self::Number {
                    value,
                    raw: number.to_string(),
                },
            },
            Value::Bool(flag) => Self::Text(flag.to_string()),
            other => Self::Text(other.to_string()),
        }
    }

    /// The text displayed for this cell.
    pub fn raw(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Text(text) => text,
            Self::Number { raw, .. } | Self::Date { raw, .. } => raw,
        }
    }

    /// Sort comparison: text case-insensitively, numbers numerically, dates
    /// chronologically. Empty cells sort first; mixed kinds compare as text.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Empty, Self::Empty) => Ordering::Equal,
            (Self::Empty, _) => Ordering::Less,
            (_, Self::Empty) => Ordering::Greater,
            (Self::Number { value: a, .. }, Self::Number { value: b, .. }) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Self::Date { value: a, .. }, Self::Date { value: b, .. }) => a.cmp(b),
            (a, b) => a.raw().to_lowercase().cmp(&b.raw().to_lowercase()),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.naive_utc());
    }
    if let Ok(value) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(value);
    }
    if let Ok(value) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(value);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
