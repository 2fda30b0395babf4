//! DuckDB codec, compiled with the `duckdb` feature

use std::path::Path;

use duckdb::types::Value;
use duckdb::{params_from_iter, AccessMode, Config as DuckConfig, Connection, OptionalExt};
use tracing::debug;

use crate::config::{Config, SqlOptions};
use crate::error::{Error, Result};
use crate::model::{column_types, CellType, CellValue, Table};

use super::sqlite::{quote_ident, sanitize_name};
use super::{create_parent, ensure_exists, Decoder, Encoder};

/// Codec for DuckDB database files
#[derive(Debug, Clone)]
pub struct DuckDbCodec {
    options: SqlOptions,
}

impl DuckDbCodec {
    pub fn new(config: &Config) -> Self {
        Self {
            options: config.sql.clone(),
        }
    }

    fn read(&self, source: &Path) -> duckdb::Result<Option<(Vec<String>, Vec<Vec<CellValue>>)>> {
        let config = DuckConfig::default().access_mode(AccessMode::ReadOnly)?;
        let conn = Connection::open_with_flags(source, config)?;

        let lookup = match self.options.read_table {
            Some(_) => {
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = 'main' AND table_name = ?"
            }
            None => {
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = 'main' ORDER BY table_name LIMIT 1"
            }
        };
        let table_name: Option<String> = match self.options.read_table {
            Some(ref name) => conn
                .query_row(lookup, [name], |row| row.get(0))
                .optional()?,
            None => conn.query_row(lookup, [], |row| row.get(0)).optional()?,
        };
        let Some(table_name) = table_name else {
            return Ok(None);
        };

        let mut columns: Vec<String> = Vec::new();
        {
            let mut stmt = conn.prepare(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_schema = 'main' AND table_name = ? ORDER BY ordinal_position",
            )?;
            let mut rows = stmt.query([&table_name])?;
            while let Some(row) = rows.next()? {
                columns.push(row.get(0)?);
            }
        }

        let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(&table_name)))?;
        let mut rows = stmt.query([])?;
        let mut cells = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(value_to_cell(row.get::<_, Value>(idx)?));
            }
            cells.push(values);
        }

        Ok(Some((columns, cells)))
    }

    fn write(&self, table: &Table, destination: &Path) -> duckdb::Result<()> {
        let mut conn = Connection::open(destination)?;
        let tx = conn.transaction()?;
        let name = quote_ident(&sanitize_name(&self.options.write_table));

        tx.execute(&format!("DROP TABLE IF EXISTS {}", name), [])?;

        if table.columns().is_empty() {
            tx.execute(&format!("CREATE TABLE {} (id INTEGER)", name), [])?;
            return tx.commit();
        }

        let types = column_types(table);
        let columns: Vec<String> = table
            .columns()
            .iter()
            .map(|c| quote_ident(&sanitize_name(c)))
            .collect();
        let definitions: Vec<String> = columns
            .iter()
            .zip(&types)
            .map(|(col, ty)| format!("{} {}", col, sql_type(*ty)))
            .collect();
        tx.execute(
            &format!("CREATE TABLE {} ({})", name, definitions.join(", ")),
            [],
        )?;

        {
            let placeholders = vec!["?"; columns.len()].join(", ");
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                name,
                columns.join(", "),
                placeholders
            ))?;
            for row in table.rows() {
                stmt.execute(params_from_iter(table.row_cells(row).map(cell_to_value)))?;
            }
        }

        tx.commit()
    }
}

impl Decoder for DuckDbCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        ensure_exists(source)?;

        let table = match self.read(source).map_err(|e| Error::decode("duckdb", e))? {
            Some((columns, cells)) => Table::from_cells(columns, cells)?,
            None => match self.options.read_table {
                Some(ref name) => {
                    return Err(Error::MissingTable {
                        path: source.to_path_buf(),
                        table: name.clone(),
                    })
                }
                None => Table::empty(),
            },
        };

        debug!(path = %source.display(), rows = table.row_count(), "decoded duckdb");
        Ok(table)
    }
}

impl Encoder for DuckDbCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        create_parent(destination, "duckdb")?;
        self.write(table, destination)
            .map_err(|e| Error::encode("duckdb", destination, e))?;
        debug!(path = %destination.display(), rows = table.row_count(), "encoded duckdb");
        Ok(())
    }
}

fn sql_type(cell_type: CellType) -> &'static str {
    match cell_type {
        CellType::Bool => "BOOLEAN",
        CellType::Int => "BIGINT",
        CellType::Float => "DOUBLE",
        CellType::Null | CellType::String | CellType::Map | CellType::Mixed => "VARCHAR",
    }
}

fn cell_to_value(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Boolean(*b),
        CellValue::Int(i) => Value::BigInt(*i),
        CellValue::Float(f) => Value::Double(*f),
        other => Value::Text(other.display().into_owned()),
    }
}

fn value_to_cell(value: Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Boolean(b) => CellValue::Bool(b),
        Value::TinyInt(i) => CellValue::Int(i.into()),
        Value::SmallInt(i) => CellValue::Int(i.into()),
        Value::Int(i) => CellValue::Int(i.into()),
        Value::BigInt(i) => CellValue::Int(i),
        Value::UTinyInt(i) => CellValue::Int(i.into()),
        Value::USmallInt(i) => CellValue::Int(i.into()),
        Value::UInt(i) => CellValue::Int(i.into()),
        Value::UBigInt(i) => match i64::try_from(i) {
            Ok(v) => CellValue::Int(v),
            Err(_) => CellValue::Float(i as f64),
        },
        Value::Float(f) => CellValue::Float(f.into()),
        Value::Double(f) => CellValue::Float(f),
        Value::Text(s) => CellValue::String(s),
        Value::Blob(bytes) => CellValue::String(bytes.iter().map(|b| format!("{:02x}", b)).collect()),
        other => CellValue::String(format!("{:?}", other)),
    }
}
