//! Canonical table model shared by every codec

mod schema;
mod table;

pub use schema::{column_types, CellType};
pub use table::{CellValue, Row, RowViolation, SchemaError, Table};
