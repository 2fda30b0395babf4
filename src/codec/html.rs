//! HTML table codec

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::coerce::coerce_markup;
use crate::config::{Config, HtmlOptions};
use crate::error::{Error, Result};
use crate::model::{CellValue, Table};

use super::{create_parent, read_text, Decoder, Encoder};

const CSS_STYLES: &str = r#"    table { border-collapse: collapse; width: 100%; }
    th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
    th { background-color: #f2f2f2; }
    tr:nth-child(even) { background-color: #fafafa; }"#;

/// Codec for `<table>` elements in an HTML document
#[derive(Debug, Clone)]
pub struct HtmlCodec {
    options: HtmlOptions,
}

impl HtmlCodec {
    pub fn new(config: &Config) -> Self {
        Self {
            options: config.html.clone(),
        }
    }

    fn render(&self, table: &Table, writer: &mut dyn Write) -> std::io::Result<()> {
        writeln!(writer, "<!DOCTYPE html>")?;
        writeln!(writer, "<html>")?;
        writeln!(writer, "<head>")?;
        writeln!(writer, "  <title>{}</title>", html_escape(&self.options.title))?;
        writeln!(writer, "  <style>")?;
        writeln!(writer, "{}", CSS_STYLES)?;
        writeln!(writer, "  </style>")?;
        writeln!(writer, "</head>")?;
        writeln!(writer, "<body>")?;
        writeln!(writer, "<table>")?;

        if !table.columns().is_empty() {
            writeln!(writer, "  <thead>")?;
            writeln!(writer, "    <tr>")?;
            for col in table.columns() {
                writeln!(writer, "      <th>{}</th>", html_escape(col))?;
            }
            writeln!(writer, "    </tr>")?;
            writeln!(writer, "  </thead>")?;
        }

        writeln!(writer, "  <tbody>")?;
        for row in table.rows() {
            writeln!(writer, "    <tr>")?;
            for cell in table.row_cells(row) {
                writeln!(writer, "      <td>{}</td>", html_escape(cell.display()))?;
            }
            writeln!(writer, "    </tr>")?;
        }
        writeln!(writer, "  </tbody>")?;

        writeln!(writer, "</table>")?;
        writeln!(writer, "</body>")?;
        writeln!(writer, "</html>")?;
        Ok(())
    }
}

impl Decoder for HtmlCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        let text = read_text(source, "html")?;
        let document = Html::parse_document(&text);

        let table_sel = selector("table")?;
        let row_sel = selector("tr")?;
        let cell_sel = selector("td, th")?;

        let Some(element) = document.select(&table_sel).nth(self.options.table_index) else {
            debug!(path = %source.display(), index = self.options.table_index, "no such html table");
            return Ok(Table::empty());
        };

        let mut raw_rows: Vec<Vec<String>> = element
            .select(&row_sel)
            .map(|tr| tr.select(&cell_sel).map(cell_text).collect())
            .collect();

        // A header without data rows yields no table
        if raw_rows.len() < 2 {
            return Ok(Table::empty());
        }

        let columns = raw_rows.remove(0);
        let cells: Vec<Vec<CellValue>> = raw_rows
            .iter()
            .map(|row| row.iter().map(|v| coerce_markup(v)).collect())
            .collect();

        let table = Table::from_cells(columns, cells)?;
        debug!(path = %source.display(), rows = table.row_count(), "decoded html");
        Ok(table)
    }
}

impl Encoder for HtmlCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        create_parent(destination, "html")?;
        let encode_err = |e: std::io::Error| Error::encode("html", destination, e);

        let file = File::create(destination).map_err(encode_err)?;
        let mut writer = BufWriter::new(file);
        self.render(table, &mut writer).map_err(encode_err)?;
        writer.flush().map_err(encode_err)?;

        debug!(path = %destination.display(), rows = table.row_count(), "encoded html");
        Ok(())
    }
}

fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::decode("html", format!("bad selector {}: {}", css, e)))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn html_escape(s: impl AsRef<str>) -> String {
    s.as_ref()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
