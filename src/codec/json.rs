//! JSON and JSON Lines codecs

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{Config, JsonOptions};
use crate::error::{Error, Result};
use crate::model::{CellValue, Row, Table};

use super::{create_parent, read_error, Decoder, Encoder};

/// Codec for a JSON array of objects
#[derive(Debug, Clone)]
pub struct JsonCodec {
    options: JsonOptions,
}

impl JsonCodec {
    pub fn new(config: &Config) -> Self {
        Self {
            options: config.json.clone(),
        }
    }
}

impl Decoder for JsonCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        let file = File::open(source).map_err(|e| read_error(source, "json", e))?;
        let value: Value = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::decode_at("json", e.line(), e))?;

        // Arrays of objects are the normal shape; a lone object is one row
        let records = match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| match item {
                    Value::Object(obj) => Ok(object_to_row(&obj)),
                    other => Err(Error::decode(
                        "json",
                        format!("array item {} is {}, expected an object", idx, kind_of(&other)),
                    )),
                })
                .collect::<Result<Vec<Row>>>()?,
            Value::Object(obj) => vec![object_to_row(&obj)],
            _ => Vec::new(),
        };

        let table = Table::from_records(records)?;
        debug!(path = %source.display(), rows = table.row_count(), "decoded json");
        Ok(table)
    }
}

impl Encoder for JsonCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        create_parent(destination, "json")?;
        let encode_err = |e: std::io::Error| Error::encode("json", destination, e);

        let rows = Value::Array(
            table
                .rows()
                .iter()
                .map(|row| Value::Object(row_to_object(table, row)))
                .collect(),
        );

        let file = File::create(destination).map_err(encode_err)?;
        let mut writer = BufWriter::new(file);
        match self.options.indent {
            Some(width) => {
                let indent = " ".repeat(width);
                let formatter = PrettyFormatter::with_indent(indent.as_bytes());
                let mut ser = serde_json::Serializer::with_formatter(&mut writer, formatter);
                rows.serialize(&mut ser)
                    .map_err(|e| Error::encode("json", destination, e))?;
            }
            None => serde_json::to_writer(&mut writer, &rows)
                .map_err(|e| Error::encode("json", destination, e))?,
        }
        writer.write_all(b"\n").map_err(encode_err)?;
        writer.flush().map_err(encode_err)?;

        debug!(path = %destination.display(), rows = table.row_count(), "encoded json");
        Ok(())
    }
}

/// Codec for newline-delimited JSON, one object per line
#[derive(Debug, Clone, Default)]
pub struct JsonLinesCodec;

impl Decoder for JsonLinesCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        let file = File::open(source).map_err(|e| read_error(source, "jsonl", e))?;

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|e| Error::decode_at("jsonl", line_no, e))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(obj)) => records.push(object_to_row(&obj)),
                Ok(other) => {
                    return Err(Error::decode_at(
                        "jsonl",
                        line_no,
                        format!("expected an object, found {}", kind_of(&other)),
                    ))
                }
                Err(e) => return Err(Error::decode_at("jsonl", line_no, e)),
            }
        }

        let table = Table::from_records(records)?;
        debug!(path = %source.display(), rows = table.row_count(), "decoded jsonl");
        Ok(table)
    }
}

impl Encoder for JsonLinesCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        create_parent(destination, "jsonl")?;
        let encode_err = |e: std::io::Error| Error::encode("jsonl", destination, e);

        let file = File::create(destination).map_err(encode_err)?;
        let mut writer = BufWriter::new(file);
        for row in table.rows() {
            let object = Value::Object(row_to_object(table, row));
            serde_json::to_writer(&mut writer, &object)
                .map_err(|e| Error::encode("jsonl", destination, e))?;
            writer.write_all(b"\n").map_err(encode_err)?;
        }
        writer.flush().map_err(encode_err)?;

        debug!(path = %destination.display(), rows = table.row_count(), "encoded jsonl");
        Ok(())
    }
}

fn object_to_row(obj: &Map<String, Value>) -> Row {
    obj.iter()
        .map(|(k, v)| (k.clone(), CellValue::from_json(v)))
        .collect()
}

fn row_to_object(table: &Table, row: &Row) -> Map<String, Value> {
    table
        .columns()
        .iter()
        .zip(table.row_cells(row))
        .map(|(name, cell)| (name.clone(), cell.to_json()))
        .collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::ErrorKind;

    fn sample() -> Table {
        Table::from_cells(
            vec!["name".to_string(), "age".to_string(), "score".to_string()],
            vec![
                vec!["Alice".into(), CellValue::Int(30), CellValue::Float(1.5)],
                vec!["Bob".into(), CellValue::Null, CellValue::Float(f64::NAN)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_read_array_of_objects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"[{"b": 1, "a": "x"}, {"b": 2, "a": null}]"#).unwrap();

        let table = JsonCodec::new(&Config::default()).decode(&path).unwrap();
        assert_eq!(table.columns(), &["b".to_string(), "a".to_string()][..]);
        assert_eq!(table.rows()[1]["a"], CellValue::Null);
        assert_eq!(table.rows()[1]["b"], CellValue::Int(2));
    }

    #[test]
    fn test_single_object_is_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.json");
        fs::write(&path, r#"{"id": 7, "tags": [1, 2]}"#).unwrap();

        let table = JsonCodec::new(&Config::default()).decode(&path).unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows()[0]["tags"], CellValue::from("[1,2]"));
    }

    #[test]
    fn test_scalar_document_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scalar.json");
        fs::write(&path, "42").unwrap();

        let table = JsonCodec::new(&Config::default()).decode(&path).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_non_object_items_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.json");
        fs::write(&path, r#"[{"a": 1}, 2]"#).unwrap();

        let err = JsonCodec::new(&Config::default()).decode(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_heterogeneous_records_fail_schema_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.json");
        fs::write(&path, r#"[{"a": 1}, {"b": 2}]"#).unwrap();

        let err = JsonCodec::new(&Config::default()).decode(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaValidation);
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "[\n{\"a\": 1},\n{oops}\n]").unwrap();

        let err = JsonCodec::new(&Config::default()).decode(&path).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);
    }

    #[test]
    fn test_write_pretty_and_compact() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::from_cells(
            vec!["a".to_string()],
            vec![vec![CellValue::Int(1)]],
        )
        .unwrap();

        let pretty = dir.path().join("pretty.json");
        JsonCodec::new(&Config::default()).encode(&table, &pretty).unwrap();
        assert_eq!(
            fs::read_to_string(&pretty).unwrap(),
            "[\n  {\n    \"a\": 1\n  }\n]\n"
        );

        let compact = dir.path().join("compact.json");
        JsonCodec::new(&Config::default().with_json_indent(None))
            .encode(&table, &compact)
            .unwrap();
        assert_eq!(fs::read_to_string(&compact).unwrap(), "[{\"a\":1}]\n");
    }

    #[test]
    fn test_write_keeps_column_order_and_nulls_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        JsonCodec::new(&Config::default().with_json_indent(None))
            .encode(&sample(), &path)
            .unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[{\"name\":\"Alice\",\"age\":30,\"score\":1.5},{\"name\":\"Bob\",\"age\":null,\"score\":null}]\n"
        );
    }

    #[test]
    fn test_jsonl_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        let table = Table::from_cells(
            vec!["k".to_string(), "v".to_string()],
            vec![
                vec!["a".into(), CellValue::Bool(true)],
                vec!["b".into(), CellValue::Null],
            ],
        )
        .unwrap();

        JsonLinesCodec.encode(&table, &path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\"k\":\"a\",\"v\":true}\n{\"k\":\"b\",\"v\":null}\n"
        );
        assert_eq!(JsonLinesCodec.decode(&path).unwrap(), table);
    }

    #[test]
    fn test_jsonl_errors_carry_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        fs::write(&path, "{\"a\": 1}\n\n[1, 2]\n").unwrap();

        let err = JsonLinesCodec.decode(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("line 3"), "{}", err);
    }
}
