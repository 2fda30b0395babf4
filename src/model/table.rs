//! Table, Row, and Cell data structures

use std::borrow::Cow;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A cell value with type information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Hierarchical child content (XML children, nested JSON/YAML/TOML objects)
    Map(IndexMap<String, CellValue>),
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CellValue::Null, CellValue::Null) => true,
            (CellValue::Bool(a), CellValue::Bool(b)) => a == b,
            (CellValue::Int(a), CellValue::Int(b)) => a == b,
            (CellValue::Float(a), CellValue::Float(b)) => {
                // Handle NaN comparison
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (CellValue::String(a), CellValue::String(b)) => a == b,
            (CellValue::Map(a), CellValue::Map(b)) => a == b,
            // Cross-type numeric comparison
            (CellValue::Int(a), CellValue::Float(b)) => (*a as f64) == *b,
            (CellValue::Float(a), CellValue::Int(b)) => *a == (*b as f64),
            _ => false,
        }
    }
}

impl CellValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text form used by string-only outputs; null renders as the empty string
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            CellValue::Null => Cow::Borrowed(""),
            CellValue::Bool(b) => Cow::Owned(b.to_string()),
            CellValue::Int(i) => Cow::Owned(i.to_string()),
            CellValue::Float(f) => Cow::Owned(f.to_string()),
            CellValue::String(s) => Cow::Borrowed(s.as_str()),
            CellValue::Map(_) => Cow::Owned(self.to_json().to_string()),
        }
    }

    /// Convert to a JSON value. Non-finite floats become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::Bool(b) => serde_json::Value::Bool(*b),
            CellValue::Int(i) => serde_json::json!(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            CellValue::String(s) => serde_json::Value::String(s.clone()),
            CellValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Convert from a JSON value. Arrays are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> CellValue {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    CellValue::Float(f)
                } else {
                    CellValue::String(n.to_string())
                }
            }
            serde_json::Value::String(s) => CellValue::String(s.clone()),
            serde_json::Value::Array(_) => CellValue::String(value.to_string()),
            serde_json::Value::Object(obj) => CellValue::Map(
                obj.iter()
                    .map(|(k, v)| (k.clone(), CellValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl<T> From<Option<T>> for CellValue
where
    T: Into<CellValue>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => CellValue::Null,
        }
    }
}

static NULL: CellValue = CellValue::Null;

/// A record mapping every column name to its value, in column order
pub type Row = IndexMap<String, CellValue>;

/// A row whose key set differs from the table's columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowViolation {
    /// 0-based row index
    pub row: usize,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl std::fmt::Display for RowViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: columns mismatch", self.row)?;
        if !self.missing.is_empty() {
            write!(f, "; missing: {:?}", self.missing)?;
        }
        if !self.extra.is_empty() {
            write!(f, "; extra: {:?}", self.extra)?;
        }
        Ok(())
    }
}

/// Violations of the table invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("columns must be unique; duplicated: {}", .0.join(", "))]
    DuplicateColumns(Vec<String>),

    #[error("{}", render_violations(.0))]
    RowMismatch(Vec<RowViolation>),
}

fn render_violations(violations: &[RowViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// A validated table: ordered unique columns and rows keyed by exactly those columns
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Build a table, checking column uniqueness and row completeness
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self, SchemaError> {
        check_unique(&columns)?;

        if !columns.is_empty() {
            check_rows(&columns, &rows)?;
        }

        Ok(Self { columns, rows })
    }

    /// The empty table (no columns, no rows)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table whose columns are the keys of the first record
    pub fn from_records(rows: Vec<Row>) -> Result<Self, SchemaError> {
        let columns = match rows.first() {
            Some(first) => first.keys().cloned().collect(),
            None => return Ok(Self::empty()),
        };
        Self::new(columns, rows)
    }

    /// Build a table from positional cells, one `Vec` per row in column order
    pub fn from_cells(columns: Vec<String>, cells: Vec<Vec<CellValue>>) -> Result<Self, SchemaError> {
        check_unique(&columns)?;

        let rows = cells
            .into_iter()
            .map(|row| {
                let mut values = row.into_iter();
                columns
                    .iter()
                    .map(|name| (name.clone(), values.next().unwrap_or(CellValue::Null)))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows in order
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True for a table with neither columns nor rows
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    /// Iterate over the cells of one row in column order
    pub fn row_cells<'a>(&'a self, row: &'a Row) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.columns
            .iter()
            .map(move |c| row.get(c).unwrap_or(&NULL))
    }

    /// Iterate over one column's values, top to bottom
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a CellValue> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(name).unwrap_or(&NULL))
    }
}

fn check_unique(columns: &[String]) -> Result<(), SchemaError> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut duplicated: Vec<String> = Vec::new();
    for name in columns {
        if !seen.insert(name.as_str()) && !duplicated.contains(name) {
            duplicated.push(name.clone());
        }
    }

    if duplicated.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::DuplicateColumns(duplicated))
    }
}

fn check_rows(columns: &[String], rows: &[Row]) -> Result<(), SchemaError> {
    let expected: FxHashSet<&str> = columns.iter().map(String::as_str).collect();

    let violations: Vec<RowViolation> = rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let mut missing: Vec<String> = columns
                .iter()
                .filter(|c| !row.contains_key(c.as_str()))
                .cloned()
                .collect();
            let mut extra: Vec<String> = row
                .keys()
                .filter(|k| !expected.contains(k.as_str()))
                .cloned()
                .collect();

            if missing.is_empty() && extra.is_empty() {
                None
            } else {
                missing.sort();
                extra.sort();
                Some(RowViolation {
                    row: idx,
                    missing,
                    extra,
                })
            }
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::RowMismatch(violations))
    }
}
