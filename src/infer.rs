//! File extension to format name inference

use std::path::Path;

use crate::error::{Error, Result};

/// Known extensions (lower-case, no dot) and the format each one selects
const EXTENSIONS: &[(&str, &str)] = &[
    ("csv", "csv"),
    ("tsv", "tsv"),
    ("json", "json"),
    ("jsonl", "jsonl"),
    ("ndjson", "jsonl"),
    ("xml", "xml"),
    ("html", "html"),
    ("md", "markdown"),
    ("markdown", "markdown"),
    ("toml", "toml"),
    ("yaml", "yaml"),
    ("yml", "yml"),
    ("parquet", "parquet"),
    ("arrow", "arrow"),
    ("xlsx", "xlsx"),
    ("toon", "toon"),
    ("db", "sqlite"),
    ("sqlite", "sqlite"),
    ("duckdb", "duckdb"),
];

/// Infer the format name from a path's extension (case-insensitive)
pub fn infer_format(path: impl AsRef<Path>) -> Result<&'static str> {
    let extension = path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, format)| *format)
        .ok_or_else(|| Error::UnknownExtension {
            extension,
            known: known_extensions(),
        })
}

/// Every recognised extension, sorted
pub fn known_extensions() -> Vec<String> {
    let mut known: Vec<String> = EXTENSIONS.iter().map(|(ext, _)| ext.to_string()).collect();
    known.sort();
    known
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_every_extension_infers_its_format() {
        for (ext, format) in EXTENSIONS {
            let path = format!("data.{}", ext);
            assert_eq!(infer_format(&path).unwrap(), *format, "{}", path);
        }
    }

    #[test]
    fn test_inference_is_case_insensitive() {
        assert_eq!(infer_format("REPORT.CSV").unwrap(), "csv");
        assert_eq!(infer_format("notes.Md").unwrap(), "markdown");
        assert_eq!(infer_format("dir.v2/events.NDJSON").unwrap(), "jsonl");
    }

    #[test]
    fn test_unknown_extension_names_it() {
        let err = infer_format("data.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFormat);
        let message = err.to_string();
        assert!(message.contains(".txt"), "{}", message);
        assert!(message.contains("parquet"), "{}", message);
    }

    #[test]
    fn test_missing_extension_fails() {
        let err = infer_format("Makefile").unwrap_err();
        assert!(err.to_string().contains("Unknown extension '.'"), "{}", err);
    }

    #[test]
    fn test_known_extensions_sorted() {
        let known = known_extensions();
        assert_eq!(known.first().map(String::as_str), Some("arrow"));
        assert!(known.windows(2).all(|w| w[0] <= w[1]));
    }
}
