//! Delimited text codec (CSV, TSV)

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tracing::debug;

use crate::coerce::coerce;
use crate::config::{Config, CsvOptions};
use crate::error::{Error, Result};
use crate::model::{CellValue, Table};

use super::{create_parent, read_error, Decoder, Encoder};

/// Codec for comma- or tab-separated files with a header row
#[derive(Debug, Clone)]
pub struct DelimitedCodec {
    format: &'static str,
    delimiter: u8,
    options: CsvOptions,
}

impl DelimitedCodec {
    /// Comma-separated values
    pub fn csv(config: &Config) -> Self {
        Self {
            format: "csv",
            delimiter: b',',
            options: config.csv.clone(),
        }
    }

    /// Tab-separated values
    pub fn tsv(config: &Config) -> Self {
        Self {
            format: "tsv",
            delimiter: b'\t',
            options: config.csv.clone(),
        }
    }

    fn parse_cell(&self, s: &str) -> CellValue {
        if self.options.infer_types {
            coerce(s)
        } else {
            CellValue::String(s.to_string())
        }
    }
}

impl Decoder for DelimitedCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        let file = File::open(source).map_err(|e| read_error(source, self.format, e))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let headers = reader
            .headers()
            .map_err(|e| Error::decode(self.format, e))?
            .clone();
        let columns: Vec<String> = headers.iter().map(str::to_string).collect();

        if columns.is_empty() {
            return Ok(Table::empty());
        }

        let mut cells: Vec<Vec<CellValue>> = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| Error::decode(self.format, e))?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

            if record.len() > columns.len() {
                return Err(Error::decode_at(
                    self.format,
                    line,
                    format!(
                        "record has {} fields but the header has {}",
                        record.len(),
                        columns.len()
                    ),
                ));
            }

            // Short records are padded with nulls by `Table::from_cells`
            cells.push(record.iter().map(|s| self.parse_cell(s)).collect());
        }

        let table = Table::from_cells(columns, cells)?;
        debug!(
            format = self.format,
            path = %source.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "decoded delimited file"
        );
        Ok(table)
    }
}

impl Encoder for DelimitedCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        create_parent(destination, self.format)?;
        let encode_err = |e: csv::Error| Error::encode(self.format, destination, e);

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(destination)
            .map_err(encode_err)?;

        if !table.columns().is_empty() {
            writer.write_record(table.columns()).map_err(encode_err)?;
            for row in table.rows() {
                let record: Vec<String> = table
                    .row_cells(row)
                    .map(|c| c.display().into_owned())
                    .collect();
                writer.write_record(&record).map_err(encode_err)?;
            }
        }

        writer
            .flush()
            .map_err(|e| Error::encode(self.format, destination, e))?;
        debug!(
            format = self.format,
            path = %destination.display(),
            rows = table.row_count(),
            "encoded delimited file"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_read_keeps_text_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        fs::write(&path, "name,age\nAlice,30\nBob,\n").unwrap();

        let table = DelimitedCodec::csv(&Config::default()).decode(&path).unwrap();
        assert_eq!(table.columns(), &["name".to_string(), "age".to_string()][..]);
        assert_eq!(table.rows()[0]["age"], CellValue::from("30"));
        assert_eq!(table.rows()[1]["age"], CellValue::from(""));
    }

    #[test]
    fn test_read_with_type_inference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        fs::write(&path, "name,age,active\nAlice,30,true\nBob,,false\n").unwrap();

        let config = Config::default().with_infer_types(true);
        let table = DelimitedCodec::csv(&config).decode(&path).unwrap();
        assert_eq!(table.rows()[0]["age"], CellValue::Int(30));
        assert_eq!(table.rows()[0]["active"], CellValue::Bool(true));
        assert_eq!(table.rows()[1]["age"], CellValue::Null);
    }

    #[test]
    fn test_short_records_are_padded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.csv");
        fs::write(&path, "a,b,c\n1\n").unwrap();

        let table = DelimitedCodec::csv(&Config::default()).decode(&path).unwrap();
        assert_eq!(table.rows()[0]["c"], CellValue::Null);
    }

    #[test]
    fn test_long_records_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.csv");
        fs::write(&path, "a,b\n1,2\n1,2,3\n").unwrap();

        let err = DelimitedCodec::csv(&Config::default()).decode(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.to_string().contains("line 3"), "{}", err);
    }

    #[test]
    fn test_duplicate_headers_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.csv");
        fs::write(&path, "a,a\n1,2\n").unwrap();

        let err = DelimitedCodec::csv(&Config::default()).decode(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaValidation);
    }

    #[test]
    fn test_tsv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("data.tsv");
        let codec = DelimitedCodec::tsv(&Config::default());
        let table = Table::from_cells(
            vec!["k".to_string(), "v".to_string()],
            vec![vec!["hello world".into(), "1".into()]],
        )
        .unwrap();

        codec.encode(&table, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "k\tv\nhello world\t1\n");
        assert_eq!(codec.decode(&path).unwrap(), table);
    }

    #[test]
    fn test_empty_file_decodes_to_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        let table = DelimitedCodec::csv(&Config::default()).decode(&path).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_header_only_keeps_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("header.csv");
        fs::write(&path, "id,name\n").unwrap();

        let table = DelimitedCodec::csv(&Config::default()).decode(&path).unwrap();
        assert_eq!(table.columns(), &["id".to_string(), "name".to_string()][..]);
        assert_eq!(table.row_count(), 0);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = DelimitedCodec::csv(&Config::default())
            .decode(&dir.path().join("nope.csv"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
