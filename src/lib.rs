//! shiftd - Tabular data interchange
//!
//! Converts tabular data between formats (CSV, JSON, XML, Parquet, Excel,
//! SQLite, TOON, ...) through a single validated in-memory table.

pub mod codec;
pub mod coerce;
pub mod config;
pub mod engine;
pub mod error;
pub mod infer;
pub mod model;
pub mod registry;

pub use codec::{Decoder, Encoder};
pub use config::Config;
pub use engine::{BatchReport, Engine, FormatList};
pub use error::{Error, ErrorKind, Result};
pub use infer::infer_format;
pub use model::{CellValue, Row, SchemaError, Table};
pub use registry::Registry;
