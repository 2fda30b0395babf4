//! SQLite codec: one database table per conversion

use std::path::Path;

use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use crate::config::{Config, SqlOptions};
use crate::error::{Error, Result};
use crate::model::{column_types, CellType, CellValue, Table};

use super::{create_parent, ensure_exists, Decoder, Encoder};

/// Codec for SQLite database files
#[derive(Debug, Clone)]
pub struct SqliteCodec {
    options: SqlOptions,
}

impl SqliteCodec {
    pub fn new(config: &Config) -> Self {
        Self {
            options: config.sql.clone(),
        }
    }

    fn read(&self, source: &Path) -> rusqlite::Result<Option<(Vec<String>, Vec<Vec<CellValue>>)>> {
        let conn = Connection::open_with_flags(source, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

        let table_name = match self.options.read_table {
            Some(ref name) => conn
                .query_row(
                    "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
                    [name],
                    |row| row.get::<_, String>(0),
                )
                .optional()?,
            None => conn
                .query_row(
                    "SELECT name FROM sqlite_master \
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                     ORDER BY rowid LIMIT 1",
                    [],
                    |row| row.get::<_, String>(0),
                )
                .optional()?,
        };
        let Some(table_name) = table_name else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(&table_name)))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut cells = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(value_to_cell(row.get_ref(idx)?));
            }
            cells.push(values);
        }

        Ok(Some((columns, cells)))
    }

    fn write(&self, table: &Table, destination: &Path) -> rusqlite::Result<()> {
        let mut conn = Connection::open(destination)?;
        let tx = conn.transaction()?;
        let name = quote_ident(&sanitize_name(&self.options.write_table));

        tx.execute(&format!("DROP TABLE IF EXISTS {}", name), [])?;

        if table.columns().is_empty() {
            tx.execute(&format!("CREATE TABLE {} (id INTEGER PRIMARY KEY)", name), [])?;
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

impl Decoder for SqliteCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        ensure_exists(source)?;

        let table = match self.read(source).map_err(|e| Error::decode("sqlite", e))? {
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

        debug!(path = %source.display(), rows = table.row_count(), "decoded sqlite");
        Ok(table)
    }
}

impl Encoder for SqliteCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        create_parent(destination, "sqlite")?;
        self.write(table, destination)
            .map_err(|e| Error::encode("sqlite", destination, e))?;
        debug!(
            path = %destination.display(),
            table = %self.options.write_table,
            rows = table.row_count(),
            "encoded sqlite"
        );
        Ok(())
    }
}

/// Keep only alphanumerics and underscores
pub(super) fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "col".to_string()
    } else {
        cleaned
    }
}

pub(super) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_type(cell_type: CellType) -> &'static str {
    match cell_type {
        CellType::Bool | CellType::Int => "INTEGER",
        CellType::Float => "REAL",
        CellType::Null | CellType::String | CellType::Map | CellType::Mixed => "TEXT",
    }
}

fn cell_to_value(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Integer(i64::from(*b)),
        CellValue::Int(i) => Value::Integer(*i),
        CellValue::Float(f) => Value::Real(*f),
        other => Value::Text(other.display().into_owned()),
    }
}

fn value_to_cell(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Int(i),
        ValueRef::Real(f) => CellValue::Float(f),
        ValueRef::Text(bytes) => CellValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            CellValue::String(bytes.iter().map(|b| format!("{:02x}", b)).collect())
        }
    }
}
