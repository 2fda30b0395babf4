//! Column type information

use serde::{Deserialize, Serialize};

use super::table::{CellValue, Table};

/// Inferred cell type for a column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    #[default]
    Null,
    Bool,
    Int,
    Float,
    String,
    Map,
    Mixed,
}

impl CellType {
    /// Type of a single value
    pub fn of(value: &CellValue) -> CellType {
        match value {
            CellValue::Null => CellType::Null,
            CellValue::Bool(_) => CellType::Bool,
            CellValue::Int(_) => CellType::Int,
            CellValue::Float(_) => CellType::Float,
            CellValue::String(_) => CellType::String,
            CellValue::Map(_) => CellType::Map,
        }
    }

    /// Widen the type to accommodate another type
    pub fn widen(self, other: CellType) -> CellType {
        if self == other {
            return self;
        }

        match (self, other) {
            (CellType::Null, t) | (t, CellType::Null) => t,
            (CellType::Int, CellType::Float) | (CellType::Float, CellType::Int) => CellType::Float,
            _ => CellType::Mixed,
        }
    }

    /// Widened type over every value of a column
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a CellValue>) -> CellType {
        values
            .into_iter()
            .fold(CellType::Null, |acc, v| acc.widen(CellType::of(v)))
    }
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellType::Null => write!(f, "null"),
            CellType::Bool => write!(f, "bool"),
            CellType::Int => write!(f, "int"),
            CellType::Float => write!(f, "float"),
            CellType::String => write!(f, "string"),
            CellType::Map => write!(f, "map"),
            CellType::Mixed => write!(f, "mixed"),
        }
    }
}

/// Inferred type of every column, in column order
pub fn column_types(table: &Table) -> Vec<CellType> {
    table
        .columns()
        .iter()
        .map(|name| CellType::infer(table.column_values(name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widen() {
        assert_eq!(CellType::Null.widen(CellType::Int), CellType::Int);
        assert_eq!(CellType::Int.widen(CellType::Float), CellType::Float);
        assert_eq!(CellType::Int.widen(CellType::String), CellType::Mixed);
        assert_eq!(CellType::Bool.widen(CellType::Bool), CellType::Bool);
    }

    #[test]
    fn test_infer_column() {
        let values = [CellValue::Int(1), CellValue::Null, CellValue::Float(2.5)];
        assert_eq!(CellType::infer(values.iter()), CellType::Float);
        assert_eq!(CellType::infer(std::iter::empty()), CellType::Null);
    }
}
