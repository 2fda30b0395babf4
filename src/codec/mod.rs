//! Codec layer: one decoder/encoder pair per format

mod columnar;
mod csv;
#[cfg(feature = "duckdb")]
mod duckdb;
mod excel;
mod html;
mod json;
mod markdown;
mod sqlite;
mod toml;
pub mod toon;
mod xml;
mod yaml;

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::Table;

pub use self::columnar::{ArrowCodec, ParquetCodec};
pub use self::csv::DelimitedCodec;
#[cfg(feature = "duckdb")]
pub use self::duckdb::DuckDbCodec;
pub use self::excel::ExcelDecoder;
pub use self::html::HtmlCodec;
pub use self::json::{JsonCodec, JsonLinesCodec};
pub use self::markdown::MarkdownCodec;
pub use self::sqlite::SqliteCodec;
pub use self::toml::TomlCodec;
pub use self::toon::ToonCodec;
pub use self::xml::XmlCodec;
pub use self::yaml::YamlCodec;

/// Reads a source into a table
pub trait Decoder: Send + Sync {
    /// Parse the source and return a validated table
    fn decode(&self, source: &Path) -> Result<Table>;
}

/// Writes a table to a destination
pub trait Encoder: Send + Sync {
    /// Serialize the table, creating parent directories as needed
    fn encode(&self, table: &Table, destination: &Path) -> Result<()>;
}

/// Fail with `NotFound` unless the source exists
pub(crate) fn ensure_exists(source: &Path) -> Result<()> {
    if source.exists() {
        Ok(())
    } else {
        Err(Error::NotFound {
            path: source.to_path_buf(),
        })
    }
}

/// Read a whole source file as UTF-8 text
pub(crate) fn read_text(source: &Path, format: &'static str) -> Result<String> {
    fs::read_to_string(source).map_err(|e| read_error(source, format, e))
}

/// Map an I/O error on a source to `NotFound` or a decode error
pub(crate) fn read_error(source: &Path, format: &'static str, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::NotFound {
            path: source.to_path_buf(),
        }
    } else {
        Error::decode(format, format!("{}: {}", source.display(), err))
    }
}

/// Create the destination's parent directory
pub(crate) fn create_parent(destination: &Path, format: &'static str) -> Result<()> {
    match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| Error::encode(format, destination, e))
        }
        _ => Ok(()),
    }
}

/// Write text to the destination, creating its parent directory
pub(crate) fn write_text(destination: &Path, format: &'static str, contents: &str) -> Result<()> {
    create_parent(destination, format)?;
    fs::write(destination, contents).map_err(|e| Error::encode(format, destination, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_read_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_text(&dir.path().join("missing.toon"), "toon").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a").join("b").join("out.txt");
        write_text(&dest, "toon", "hello").unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "hello");
    }

    #[test]
    fn test_write_into_file_path_fails_with_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let err = write_text(&blocker.join("out.txt"), "toon", "hello").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encode);
    }
}
