//! YAML codec

use std::path::Path;

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{CellValue, Row, Table};

use super::{read_text, write_text, Decoder, Encoder};

/// Codec for a YAML sequence of mappings (or a single mapping)
#[derive(Debug, Clone, Default)]
pub struct YamlCodec;

impl Decoder for YamlCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        let text = read_text(source, "yaml")?;
        let value: Value = serde_yaml::from_str(&text).map_err(|e| match e.location() {
            Some(loc) => Error::decode_at("yaml", loc.line(), e),
            None => Error::decode("yaml", e),
        })?;

        // Items that are not mappings carry no columns and are skipped
        let records: Vec<Row> = match untag(&value) {
            Value::Sequence(items) => items
                .iter()
                .filter_map(|item| match untag(item) {
                    Value::Mapping(map) => Some(mapping_to_row(map)),
                    _ => None,
                })
                .collect(),
            Value::Mapping(map) => vec![mapping_to_row(map)],
            _ => Vec::new(),
        };

        let table = Table::from_records(records)?;
        debug!(path = %source.display(), rows = table.row_count(), "decoded yaml");
        Ok(table)
    }
}

impl Encoder for YamlCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        let rows: Vec<IndexMap<&str, &CellValue>> = table
            .rows()
            .iter()
            .map(|row| {
                table
                    .columns()
                    .iter()
                    .map(String::as_str)
                    .zip(table.row_cells(row))
                    .collect()
            })
            .collect();

        let text =
            serde_yaml::to_string(&rows).map_err(|e| Error::encode("yaml", destination, e))?;
        write_text(destination, "yaml", &text)?;
        debug!(path = %destination.display(), rows = table.row_count(), "encoded yaml");
        Ok(())
    }
}

fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

fn mapping_to_row(map: &Mapping) -> Row {
    map.iter()
        .map(|(k, v)| (key_text(k), yaml_to_cell(v)))
        .collect()
}

fn key_text(key: &Value) -> String {
    match untag(key) {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn yaml_to_cell(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Bool(b) => CellValue::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        Value::String(s) => CellValue::String(s.clone()),
        Value::Sequence(_) => CellValue::String(
            serde_json::to_string(value).unwrap_or_else(|_| {
                serde_yaml::to_string(value)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_default()
            }),
        ),
        Value::Mapping(map) => CellValue::Map(
            map.iter()
                .map(|(k, v)| (key_text(k), yaml_to_cell(v)))
                .collect(),
        ),
        Value::Tagged(tagged) => yaml_to_cell(&tagged.value),
    }
}
