//! Error types for shiftd

use std::path::PathBuf;

use thiserror::Error;

use crate::model::SchemaError;

/// Result alias used throughout the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    UnknownFormat,
    UnavailableCapability,
    Decode,
    SchemaValidation,
    Encode,
}

/// Errors produced while decoding, validating or encoding tables
#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// A named table or sheet is absent from an existing source
    #[error("'{table}' not found in {}", .path.display())]
    MissingTable { path: PathBuf, table: String },

    #[error("Unknown format: {name}. Available: {}", .known.join(", "))]
    UnknownFormat { name: String, known: Vec<String> },

    #[error("Unknown extension '.{extension}'. Supported: {}", .known.join(", "))]
    UnknownExtension { extension: String, known: Vec<String> },

    #[error("format '{name}' is not available: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("failed to decode {format}{}: {message}", line_suffix(.line))]
    Decode {
        format: &'static str,
        line: Option<usize>,
        message: String,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("failed to encode {format} to {}: {message}", .path.display())]
    Encode {
        format: &'static str,
        path: PathBuf,
        message: String,
    },
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" (line {})", line),
        None => String::new(),
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } | Error::MissingTable { .. } => ErrorKind::NotFound,
            Error::UnknownFormat { .. } | Error::UnknownExtension { .. } => {
                ErrorKind::UnknownFormat
            }
            Error::Unavailable { .. } => ErrorKind::UnavailableCapability,
            Error::Decode { .. } => ErrorKind::Decode,
            Error::Schema(_) => ErrorKind::SchemaValidation,
            Error::Encode { .. } => ErrorKind::Encode,
        }
    }

    pub(crate) fn decode(format: &'static str, message: impl ToString) -> Self {
        Error::Decode {
            format,
            line: None,
            message: message.to_string(),
        }
    }

    pub(crate) fn decode_at(format: &'static str, line: usize, message: impl ToString) -> Self {
        Error::Decode {
            format,
            line: Some(line),
            message: message.to_string(),
        }
    }

    pub(crate) fn encode(
        format: &'static str,
        path: impl Into<PathBuf>,
        message: impl ToString,
    ) -> Self {
        Error::Encode {
            format,
            path: path.into(),
            message: message.to_string(),
        }
    }
}
