//! TOML codec

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::{Config, TomlOptions};
use crate::error::{Error, Result};
use crate::model::{CellValue, Row, Table};

use super::{read_text, write_text, Decoder, Encoder};

static BARE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("bare key pattern is valid"));

/// Codec for an array of tables (`[[row]]`), or a flat document read as one row
#[derive(Debug, Clone)]
pub struct TomlCodec {
    options: TomlOptions,
}

impl TomlCodec {
    pub fn new(config: &Config) -> Self {
        Self {
            options: config.toml.clone(),
        }
    }
}

impl Decoder for TomlCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        let text = read_text(source, "toml")?;
        let document: toml::Table = text.parse().map_err(|e: toml::de::Error| {
            match e.span() {
                Some(span) => Error::decode_at("toml", line_of(&text, span.start), e.message()),
                None => Error::decode("toml", e.message()),
            }
        })?;

        let records = find_rows(&document)?;
        let table = Table::from_records(records)?;
        debug!(path = %source.display(), rows = table.row_count(), "decoded toml");
        Ok(table)
    }
}

impl Encoder for TomlCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        let header = format!("[[{}]]", format_key(&self.options.table_name));
        let mut lines: Vec<String> = Vec::new();
        for row in table.rows() {
            lines.push(header.clone());
            for (name, cell) in table.columns().iter().zip(table.row_cells(row)) {
                lines.push(format!("{} = {}", format_key(name), cell_to_toml(cell)));
            }
            lines.push(String::new());
        }

        write_text(destination, "toml", &lines.join("\n"))?;
        debug!(path = %destination.display(), rows = table.row_count(), "encoded toml");
        Ok(())
    }
}

/// The first top-level array of tables, else the whole document as one row
fn find_rows(document: &toml::Table) -> Result<Vec<Row>> {
    let array = document.values().find_map(|value| match value {
        toml::Value::Array(items) if matches!(items.first(), Some(toml::Value::Table(_))) => {
            Some(items)
        }
        _ => None,
    });

    match array {
        Some(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| match item {
                toml::Value::Table(t) => Ok(table_to_row(t)),
                _ => Err(Error::decode(
                    "toml",
                    format!("array item {} is not a table", idx),
                )),
            })
            .collect(),
        None if document.is_empty() => Ok(Vec::new()),
        None => Ok(vec![table_to_row(document)]),
    }
}

fn table_to_row(table: &toml::Table) -> Row {
    table
        .iter()
        .map(|(k, v)| (k.clone(), toml_to_cell(v)))
        .collect()
}

fn toml_to_cell(value: &toml::Value) -> CellValue {
    match value {
        toml::Value::String(s) => CellValue::String(s.clone()),
        toml::Value::Integer(i) => CellValue::Int(*i),
        toml::Value::Float(f) => CellValue::Float(*f),
        toml::Value::Boolean(b) => CellValue::Bool(*b),
        toml::Value::Datetime(dt) => CellValue::String(dt.to_string()),
        toml::Value::Array(_) => CellValue::String(
            serde_json::to_string(value).unwrap_or_else(|_| value.to_string()),
        ),
        toml::Value::Table(t) => CellValue::Map(
            t.iter()
                .map(|(k, v)| (k.clone(), toml_to_cell(v)))
                .collect(),
        ),
    }
}

/// TOML has no null; nulls are written as empty strings
fn cell_to_toml(cell: &CellValue) -> toml::Value {
    match cell {
        CellValue::Null => toml::Value::String(String::new()),
        CellValue::Bool(b) => toml::Value::Boolean(*b),
        CellValue::Int(i) => toml::Value::Integer(*i),
        CellValue::Float(f) => toml::Value::Float(*f),
        CellValue::String(s) => toml::Value::String(s.clone()),
        CellValue::Map(map) => toml::Value::Table(
            map.iter()
                .map(|(k, v)| (k.clone(), cell_to_toml(v)))
                .collect(),
        ),
    }
}

fn format_key(key: &str) -> String {
    if BARE_KEY.is_match(key) {
        key.to_string()
    } else {
        toml::Value::String(key.to_string()).to_string()
    }
}

fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}
