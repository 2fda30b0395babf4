//! Markdown pipe-table codec

use std::mem;
use std::path::Path;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use tracing::debug;

use crate::coerce::coerce_markup;
use crate::error::Result;
use crate::model::{CellValue, Table};

use super::{read_text, write_text, Decoder, Encoder};

/// Codec for the first GitHub-style table in a Markdown document
#[derive(Debug, Clone, Default)]
pub struct MarkdownCodec;

impl Decoder for MarkdownCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        let text = read_text(source, "markdown")?;
        let Some((header, body)) = first_table(&text) else {
            return Ok(Table::empty());
        };

        if body.is_empty() {
            return Ok(Table::empty());
        }

        let cells: Vec<Vec<CellValue>> = body
            .iter()
            .map(|row| row.iter().map(|v| coerce_markup(v)).collect())
            .collect();

        let table = Table::from_cells(header, cells)?;
        debug!(path = %source.display(), rows = table.row_count(), "decoded markdown");
        Ok(table)
    }
}

impl Encoder for MarkdownCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        if table.columns().is_empty() {
            return write_text(destination, "markdown", "");
        }

        let mut lines: Vec<String> = Vec::with_capacity(table.row_count() + 2);
        lines.push(pipe_row(table.columns().iter().map(|c| escape_cell(c))));
        lines.push(pipe_row(table.columns().iter().map(|_| "---".to_string())));
        for row in table.rows() {
            lines.push(pipe_row(
                table.row_cells(row).map(|cell| escape_cell(&cell.display())),
            ));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        write_text(destination, "markdown", &out)?;
        debug!(path = %destination.display(), rows = table.row_count(), "encoded markdown");
        Ok(())
    }
}

type RawTable = (Vec<String>, Vec<Vec<String>>);

/// Header cells and body rows of the first table, as trimmed text
fn first_table(text: &str) -> Option<RawTable> {
    let parser = Parser::new_ext(text, Options::ENABLE_TABLES);

    let mut in_table = false;
    let mut in_cell = false;
    let mut cell = String::new();
    let mut row: Vec<String> = Vec::new();
    let mut header: Option<Vec<String>> = None;
    let mut body: Vec<Vec<String>> = Vec::new();

    for event in parser {
        match event {
            Event::Start(Tag::Table(_)) => in_table = true,
            Event::Start(Tag::TableCell) if in_table => {
                in_cell = true;
                cell.clear();
            }
            Event::End(TagEnd::TableCell) if in_table => {
                in_cell = false;
                row.push(cell.trim().to_string());
            }
            Event::End(TagEnd::TableHead) if in_table => header = Some(mem::take(&mut row)),
            Event::End(TagEnd::TableRow) if in_table => body.push(mem::take(&mut row)),
            Event::End(TagEnd::Table) if in_table => break,
            Event::Text(t) | Event::Code(t) if in_cell => cell.push_str(&t),
            Event::SoftBreak | Event::HardBreak if in_cell => cell.push(' '),
            _ => {}
        }
    }

    header.map(|h| (h, body))
}

fn pipe_row(cells: impl Iterator<Item = String>) -> String {
    format!("| {} |", cells.collect::<Vec<_>>().join(" | "))
}

fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\r', '\n'], " ")
}
