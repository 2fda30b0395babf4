//! Columnar codecs backed by Arrow record batches (Parquet, Arrow IPC)

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray,
};
use arrow::datatypes::{
    DataType as ArrowType, Field, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
    Int8Type, Schema, SchemaRef, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::error::ArrowError;
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{column_types, CellType, CellValue, Table};

use super::{create_parent, ensure_exists, Decoder, Encoder};

/// Codec for Parquet files
#[derive(Debug, Clone, Default)]
pub struct ParquetCodec;

impl Decoder for ParquetCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        ensure_exists(source)?;
        let file = File::open(source).map_err(|e| Error::decode("parquet", e))?;

        let builder =
            ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| Error::decode("parquet", e))?;
        let schema = builder.schema().clone();
        let reader = builder.build().map_err(|e| Error::decode("parquet", e))?;

        let table = batches_to_table("parquet", schema, reader)?;
        debug!(path = %source.display(), rows = table.row_count(), "decoded parquet");
        Ok(table)
    }
}

impl Encoder for ParquetCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        create_parent(destination, "parquet")?;
        let batch = table_to_batch(table).map_err(|e| Error::encode("parquet", destination, e))?;

        let file = File::create(destination).map_err(|e| Error::encode("parquet", destination, e))?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
            .map_err(|e| Error::encode("parquet", destination, e))?;
        writer
            .write(&batch)
            .map_err(|e| Error::encode("parquet", destination, e))?;
        writer
            .close()
            .map_err(|e| Error::encode("parquet", destination, e))?;

        debug!(path = %destination.display(), rows = table.row_count(), "encoded parquet");
        Ok(())
    }
}

/// Codec for Arrow IPC files
#[derive(Debug, Clone, Default)]
pub struct ArrowCodec;

impl Decoder for ArrowCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        ensure_exists(source)?;
        let file = File::open(source).map_err(|e| Error::decode("arrow", e))?;

        let reader = FileReader::try_new(file, None).map_err(|e| Error::decode("arrow", e))?;
        let schema = reader.schema();

        let table = batches_to_table("arrow", schema, reader)?;
        debug!(path = %source.display(), rows = table.row_count(), "decoded arrow");
        Ok(table)
    }
}

impl Encoder for ArrowCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        create_parent(destination, "arrow")?;
        let batch = table_to_batch(table).map_err(|e| Error::encode("arrow", destination, e))?;

        let file = File::create(destination).map_err(|e| Error::encode("arrow", destination, e))?;
        let mut writer = FileWriter::try_new(file, &batch.schema())
            .map_err(|e| Error::encode("arrow", destination, e))?;
        writer
            .write(&batch)
            .map_err(|e| Error::encode("arrow", destination, e))?;
        writer
            .finish()
            .map_err(|e| Error::encode("arrow", destination, e))?;

        debug!(path = %destination.display(), rows = table.row_count(), "encoded arrow");
        Ok(())
    }
}

fn batches_to_table(
    format: &'static str,
    schema: SchemaRef,
    batches: impl Iterator<Item = std::result::Result<RecordBatch, ArrowError>>,
) -> Result<Table> {
    let columns: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();

    let mut cells: Vec<Vec<CellValue>> = Vec::new();
    for batch in batches {
        let batch = batch.map_err(|e| Error::decode(format, e))?;
        for row_idx in 0..batch.num_rows() {
            cells.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| extract_cell_value(col, row_idx))
                    .collect(),
            );
        }
    }

    Ok(Table::from_cells(columns, cells)?)
}

fn extract_cell_value(array: &ArrayRef, row_idx: usize) -> CellValue {
    if array.is_null(row_idx) {
        return CellValue::Null;
    }

    match array.data_type() {
        ArrowType::Null => CellValue::Null,
        ArrowType::Boolean => CellValue::Bool(array.as_boolean().value(row_idx)),
        ArrowType::Int8 => CellValue::Int(array.as_primitive::<Int8Type>().value(row_idx).into()),
        ArrowType::Int16 => CellValue::Int(array.as_primitive::<Int16Type>().value(row_idx).into()),
        ArrowType::Int32 => CellValue::Int(array.as_primitive::<Int32Type>().value(row_idx).into()),
        ArrowType::Int64 => CellValue::Int(array.as_primitive::<Int64Type>().value(row_idx)),
        ArrowType::UInt8 => CellValue::Int(array.as_primitive::<UInt8Type>().value(row_idx).into()),
        ArrowType::UInt16 => {
            CellValue::Int(array.as_primitive::<UInt16Type>().value(row_idx).into())
        }
        ArrowType::UInt32 => {
            CellValue::Int(array.as_primitive::<UInt32Type>().value(row_idx).into())
        }
        ArrowType::UInt64 => {
            let v = array.as_primitive::<UInt64Type>().value(row_idx);
            match i64::try_from(v) {
                Ok(i) => CellValue::Int(i),
                Err(_) => CellValue::Float(v as f64),
            }
        }
        ArrowType::Float32 => {
            CellValue::Float(array.as_primitive::<Float32Type>().value(row_idx).into())
        }
        ArrowType::Float64 => CellValue::Float(array.as_primitive::<Float64Type>().value(row_idx)),
        ArrowType::Utf8 => CellValue::String(array.as_string::<i32>().value(row_idx).to_string()),
        ArrowType::LargeUtf8 => {
            CellValue::String(array.as_string::<i64>().value(row_idx).to_string())
        }
        _ => {
            // Dates, timestamps, decimals and nested types keep their display text
            match ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default()) {
                Ok(fmt) => CellValue::String(fmt.value(row_idx).to_string()),
                Err(_) => CellValue::Null,
            }
        }
    }
}

fn table_to_batch(table: &Table) -> std::result::Result<RecordBatch, ArrowError> {
    let types = column_types(table);

    let mut fields: Vec<Field> = Vec::with_capacity(table.column_count());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.column_count());
    for (name, cell_type) in table.columns().iter().zip(types) {
        let values: Vec<&CellValue> = table.column_values(name).collect();
        let (data_type, array) = build_array(cell_type, &values);
        fields.push(Field::new(name.as_str(), data_type, true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(table.row_count()));
    RecordBatch::try_new_with_options(schema, arrays, &options)
}

fn build_array(cell_type: CellType, values: &[&CellValue]) -> (ArrowType, ArrayRef) {
    match cell_type {
        CellType::Bool => {
            let arr: BooleanArray = values
                .iter()
                .map(|v| match v {
                    CellValue::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect();
            (ArrowType::Boolean, Arc::new(arr))
        }
        CellType::Int => {
            let arr: Int64Array = values
                .iter()
                .map(|v| match v {
                    CellValue::Int(i) => Some(*i),
                    _ => None,
                })
                .collect();
            (ArrowType::Int64, Arc::new(arr))
        }
        CellType::Float => {
            let arr: Float64Array = values
                .iter()
                .map(|v| match v {
                    CellValue::Int(i) => Some(*i as f64),
                    CellValue::Float(f) => Some(*f),
                    _ => None,
                })
                .collect();
            (ArrowType::Float64, Arc::new(arr))
        }
        CellType::Null | CellType::String | CellType::Map | CellType::Mixed => {
            let arr: StringArray = values
                .iter()
                .map(|v| match v {
                    CellValue::Null => None,
                    other => Some(other.display().into_owned()),
                })
                .collect();
            (ArrowType::Utf8, Arc::new(arr))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sample() -> Table {
        Table::from_cells(
            vec![
                "id".to_string(),
                "name".to_string(),
                "score".to_string(),
                "active".to_string(),
                "mixed".to_string(),
            ],
            vec![
                vec![
                    CellValue::Int(1),
                    "Alice".into(),
                    CellValue::Float(9.5),
                    CellValue::Bool(true),
                    CellValue::Int(7),
                ],
                vec![
                    CellValue::Int(2),
                    CellValue::Null,
                    CellValue::Int(8),
                    CellValue::Null,
                    "seven".into(),
                ],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parquet_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.parquet");

        ParquetCodec.encode(&sample(), &path).unwrap();
        let table = ParquetCodec.decode(&path).unwrap();

        assert_eq!(table.columns(), sample().columns());
        assert_eq!(table.rows()[0]["id"], CellValue::Int(1));
        assert_eq!(table.rows()[1]["name"], CellValue::Null);
        assert_eq!(table.rows()[1]["score"], CellValue::Float(8.0));
        assert_eq!(table.rows()[1]["active"], CellValue::Null);
        // Mixed columns are stored as text
        assert_eq!(table.rows()[0]["mixed"], CellValue::from("7"));
    }

    #[test]
    fn test_arrow_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.arrow");

        ArrowCodec.encode(&sample(), &path).unwrap();
        let table = ArrowCodec.decode(&path).unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[0]["name"], CellValue::from("Alice"));
        assert_eq!(table.rows()[0]["active"], CellValue::Bool(true));
    }

    #[test]
    fn test_zero_row_table_keeps_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.arrow");
        let table = Table::new(vec!["a".to_string()], Vec::new()).unwrap();

        ArrowCodec.encode(&table, &path).unwrap();
        let back = ArrowCodec.decode(&path).unwrap();
        assert_eq!(back.columns(), &["a".to_string()][..]);
        assert_eq!(back.row_count(), 0);
    }

    #[test]
    fn test_garbage_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.parquet");
        std::fs::write(&path, b"not parquet").unwrap();
        assert_eq!(ParquetCodec.decode(&path).unwrap_err().kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArrowCodec.decode(&dir.path().join("nope.arrow")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
