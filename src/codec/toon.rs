//! TOON tabular notation
//!
//! One table per document:
//!
//! ```text
//! [2]{name,age}:
//!   Alice,30
//!   Bob,25
//! ```
//!
//! The header carries an optional key, the row count and the field list. Each
//! following line is one row of comma-separated cells. A cell containing a
//! comma, newline or double quote is wrapped in double quotes with embedded
//! quotes doubled; every other cell is written bare.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::coerce::coerce;
use crate::error::{Error, Result};
use crate::model::{CellValue, Table};

use super::{read_text, write_text, Decoder, Encoder};

const FORMAT: &str = "toon";

// Root-level `[N]{fields}:` or `key[N]{fields}:`
static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\w+)?\[(?P<count>\d+)\]\{(?P<fields>[^}]+)\}:\s*$")
        .expect("TOON header pattern is valid")
});

/// Codec for `.toon` files
#[derive(Debug, Clone, Copy, Default)]
pub struct ToonCodec;

impl Decoder for ToonCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        let content = read_text(source, FORMAT)?;
        let table = decode_str(&content)?;
        debug!(
            path = %source.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "decoded toon document"
        );
        Ok(table)
    }
}

impl Encoder for ToonCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        if let Some(name) = table.columns().iter().find(|c| !is_header_safe(c)) {
            return Err(Error::encode(
                FORMAT,
                destination,
                format!("column name {:?} cannot appear in a TOON header", name),
            ));
        }

        write_text(destination, FORMAT, &encode_table(table))?;
        debug!(
            path = %destination.display(),
            rows = table.row_count(),
            "encoded toon document"
        );
        Ok(())
    }
}

fn is_header_safe(name: &str) -> bool {
    !name.contains([',', '}', '\n', '\r'])
}

/// One cell as written in the source row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCell {
    /// Cell text with quotes removed and doubled quotes collapsed
    pub text: String,
    /// The cell contained a quoted section
    pub quoted: bool,
}

impl RawCell {
    /// Quoted cells stay literal strings; bare cells go through coercion
    pub fn into_value(self) -> CellValue {
        if self.quoted {
            CellValue::String(self.text)
        } else {
            coerce(&self.text)
        }
    }
}

/// A row split into cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRow {
    pub cells: Vec<RawCell>,
    /// The row ended inside a quote
    pub open: bool,
    /// The row ended inside a quote that opened at the start of its cell,
    /// so the cell may continue on the next physical line
    pub continues: bool,
}

/// Split a row on commas outside double quotes.
///
/// A quote still open at the end of the row closes there.
pub fn split_row(row: &str) -> SplitRow {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut opened_at_start = false;

    let mut chars = row.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => {
                // Padding before the opening quote is not part of the cell
                opened_at_start = !quoted && current.trim().is_empty();
                if opened_at_start {
                    current.clear();
                }
                quoted = true;
                in_quotes = true;
            }
            ',' if !in_quotes => {
                cells.push(finish_cell(&mut current, quoted));
                quoted = false;
            }
            c if quoted && !in_quotes && c.is_whitespace() => {}
            c => current.push(c),
        }
    }

    cells.push(finish_cell(&mut current, quoted));
    SplitRow {
        cells,
        open: in_quotes,
        continues: in_quotes && opened_at_start,
    }
}

/// Join the lines following `first` while a quoted cell stays open.
///
/// Returns the cells and the number of extra lines consumed, or `None` when
/// the quote never closes cleanly or the joined row is wider than `width`.
fn join_quoted_cell(
    first: &str,
    rest: &[(usize, &str)],
    width: usize,
) -> Option<(Vec<RawCell>, usize)> {
    let mut record = first.to_string();
    for (used, (_, next)) in rest.iter().enumerate() {
        record.push('\n');
        record.push_str(next);

        let split = split_row(&record);
        if split.continues {
            continue;
        }
        if split.open || split.cells.len() > width {
            return None;
        }
        return Some((split.cells, used + 1));
    }
    None
}

fn finish_cell(current: &mut String, quoted: bool) -> RawCell {
    let text = std::mem::take(current);
    if quoted {
        RawCell { text, quoted }
    } else {
        RawCell {
            text: text.trim().to_string(),
            quoted,
        }
    }
}

/// Decode a TOON document.
///
/// A document whose first non-blank line is not a header decodes to the empty
/// table. Missing trailing rows are tolerated, missing trailing cells become
/// null and surplus cells are dropped.
pub fn decode_str(input: &str) -> Result<Table> {
    let mut lines = input.lines().enumerate().map(|(idx, line)| (idx + 1, line));

    let Some((header_line, header)) = lines.by_ref().find(|(_, l)| !l.trim().is_empty()) else {
        return Ok(Table::empty());
    };
    let Some(caps) = HEADER.captures(header.trim()) else {
        return Ok(Table::empty());
    };

    let count: usize = caps["count"]
        .parse()
        .map_err(|_| Error::decode_at(FORMAT, header_line, "row count out of range"))?;
    let fields: Vec<String> = caps["fields"]
        .split(',')
        .map(|f| f.trim().to_string())
        .collect();

    let rest: Vec<(usize, &str)> = lines.collect();
    let mut pos = 0;
    let mut rows: Vec<Vec<CellValue>> = Vec::with_capacity(count.min(4096));
    while rows.len() < count {
        let Some(offset) = rest[pos..].iter().position(|(_, l)| !l.trim().is_empty()) else {
            break;
        };
        let (line_no, line) = rest[pos + offset];
        pos += offset + 1;

        let record = line.trim_start();
        let split = split_row(record);
        let mut cells = if split.continues {
            match join_quoted_cell(record, &rest[pos..], fields.len()) {
                Some((cells, used)) => {
                    pos += used;
                    cells
                }
                None => split.cells,
            }
        } else {
            split.cells
        };

        if cells.len() > fields.len() {
            debug!(
                line = line_no,
                cells = cells.len(),
                fields = fields.len(),
                "dropping surplus toon cells"
            );
            cells.truncate(fields.len());
        }

        rows.push(cells.into_iter().map(RawCell::into_value).collect());
    }

    Ok(Table::from_cells(fields, rows)?)
}

/// Encode a table as a TOON document.
///
/// A table without columns or without rows encodes to the empty document.
pub fn encode_table(table: &Table) -> String {
    if table.columns().is_empty() || table.rows().is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(table.row_count() + 1);
    lines.push(format!(
        "[{}]{{{}}}:",
        table.row_count(),
        table.columns().join(",")
    ));

    for row in table.rows() {
        let cells: Vec<String> = table.row_cells(row).map(format_cell).collect();
        lines.push(format!("  {}", cells.join(",")));
    }

    lines.join("\n")
}

/// Format one cell value
pub fn format_cell(value: &CellValue) -> String {
    match value {
        CellValue::Null => "null".to_string(),
        CellValue::Bool(b) => b.to_string(),
        CellValue::Int(i) => i.to_string(),
        CellValue::Float(f) if !f.is_finite() => "null".to_string(),
        // Debug keeps the fraction on whole floats (`3.0`) so they read back as floats
        CellValue::Float(f) => format!("{:?}", f),
        CellValue::String(s) => quote_if_needed(s),
        CellValue::Map(_) => quote_if_needed(&value.display()),
    }
}

fn quote_if_needed(s: &str) -> String {
    if s.contains([',', '\n', '"']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
