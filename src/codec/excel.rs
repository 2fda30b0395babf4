//! Spreadsheet decoder (xlsx, xls, ods)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::debug;

use crate::config::{Config, ExcelOptions};
use crate::error::{Error, Result};
use crate::model::{CellValue, Table};

use super::{ensure_exists, Decoder};

/// Reads one worksheet; the first row is the header
#[derive(Debug, Clone)]
pub struct ExcelDecoder {
    options: ExcelOptions,
}

impl ExcelDecoder {
    pub fn new(config: &Config) -> Self {
        Self {
            options: config.excel.clone(),
        }
    }
}

impl Decoder for ExcelDecoder {
    fn decode(&self, source: &Path) -> Result<Table> {
        ensure_exists(source)?;
        let mut workbook = open_workbook_auto(source).map_err(|e| Error::decode("xlsx", e))?;

        let sheet_name = match self.options.sheet_name {
            Some(ref name) => {
                if !workbook.sheet_names().iter().any(|s| s == name) {
                    return Err(Error::MissingTable {
                        path: source.to_path_buf(),
                        table: name.clone(),
                    });
                }
                name.clone()
            }
            None => match workbook.sheet_names().first() {
                Some(first) => first.clone(),
                None => return Ok(Table::empty()),
            },
        };

        let range: Range<Data> = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| Error::decode("xlsx", format!("sheet '{}': {}", sheet_name, e)))?;

        let table = parse_range(&range)?;
        debug!(
            path = %source.display(),
            sheet = %sheet_name,
            rows = table.row_count(),
            "decoded spreadsheet"
        );
        Ok(table)
    }
}

fn parse_range(range: &Range<Data>) -> Result<Table> {
    let mut rows = range.rows();

    let Some(header_row) = rows.next() else {
        return Ok(Table::empty());
    };
    let columns: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell_to_string(cell);
            if name.is_empty() {
                format!("Column{}", i + 1)
            } else {
                name
            }
        })
        .collect();

    let cells: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    Ok(Table::from_cells(columns, cells)?)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{:?}", e),
    }
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => {
            if s.trim().is_empty() {
                CellValue::Null
            } else {
                CellValue::String(s.clone())
            }
        }
        Data::Float(f) => {
            // Whole numbers are stored as floats by most writers
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                CellValue::Int(*f as i64)
            } else {
                CellValue::Float(*f)
            }
        }
        Data::Int(i) => CellValue::Int(*i),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::String(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(format!("#{:?}", e)),
    }
}
