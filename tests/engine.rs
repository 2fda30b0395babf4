//! End-to-end conversions through the engine facade

use std::fs;
use std::path::Path;

use shiftd::config::BatchMode;
use shiftd::{CellValue, Config, Engine, ErrorKind, Row, Table};

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn row(pairs: &[(&str, CellValue)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_csv_to_json() {
    let dir = tempfile::tempdir().unwrap();
    let src = write(dir.path(), "users.csv", "name,age\nAlice,30\n");
    let dest = dir.path().join("users.json");

    let out = Engine::new().convert(&src, &dest, None).unwrap();
    assert_eq!(out, dest);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
    assert_eq!(json, serde_json::json!([{"name": "Alice", "age": "30"}]));
}

#[test]
fn test_csv_to_json_with_type_inference() {
    let dir = tempfile::tempdir().unwrap();
    let src = write(dir.path(), "users.csv", "name,age,active\nAlice,30,true\n");
    let dest = dir.path().join("users.json");

    Engine::with_config(Config::new().with_infer_types(true))
        .convert(&src, &dest, None)
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&dest).unwrap()).unwrap();
    assert_eq!(json, serde_json::json!([{"name": "Alice", "age": 30, "active": true}]));
}

#[test]
fn test_toon_to_csv_and_back() {
    let dir = tempfile::tempdir().unwrap();
    let src = write(dir.path(), "people.toon", "[2]{name,age}:\n  Alice,30\n  Bob,25");
    let csv = dir.path().join("people.csv");

    let engine = Engine::with_config(Config::new().with_infer_types(true));
    engine.convert(&src, &csv, None).unwrap();
    assert_eq!(fs::read_to_string(&csv).unwrap(), "name,age\nAlice,30\nBob,25\n");

    let back = dir.path().join("back.toon");
    engine.convert(&csv, &back, None).unwrap();
    assert_eq!(fs::read_to_string(&back).unwrap(), "[2]{name,age}:\n  Alice,30\n  Bob,25");
}

#[test]
fn test_explicit_target_overrides_extension() {
    let dir = tempfile::tempdir().unwrap();
    let src = write(dir.path(), "data.csv", "a\n1\n");
    let dest = dir.path().join("data.out");

    Engine::new().convert(&src, &dest, Some("JSONL")).unwrap();
    assert_eq!(fs::read_to_string(&dest).unwrap(), "{\"a\":\"1\"}\n");
}

#[test]
fn test_missing_source_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = Engine::new()
        .convert(dir.path().join("absent.csv"), dir.path().join("out.json"), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_unwritable_format_fails_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let src = write(dir.path(), "data.csv", "a\n1\n");
    let dest = dir.path().join("data.xlsx");

    let err = Engine::new().convert(&src, &dest, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnavailableCapability);
    assert!(!dest.exists());
}

#[test]
fn test_batch_writes_one_file_per_input_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.csv", "x\n1\n");
    let b = write(dir.path(), "b.csv", "x\n2\n");
    let out = dir.path().join("out");

    let written = Engine::new().batch_convert(&[&a, &b], &out, "json").unwrap();
    assert_eq!(written, vec![out.join("a.json"), out.join("b.json")]);
    assert!(out.join("a.json").exists());
    assert!(out.join("b.json").exists());
}

#[test]
fn test_parallel_batch_keeps_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let sources: Vec<_> = (0..6)
        .map(|i| write(dir.path(), &format!("f{}.csv", i), &format!("n\n{}\n", i)))
        .collect();
    let out = dir.path().join("out");

    let engine = Engine::with_config(Config::new().with_parallel(true));
    let written = engine.batch_convert(&sources, &out, "toon").unwrap();

    let expected: Vec<_> = (0..6).map(|i| out.join(format!("f{}.toon", i))).collect();
    assert_eq!(written, expected);
    assert_eq!(
        fs::read_to_string(out.join("f3.toon")).unwrap(),
        "[1]{n}:\n  3"
    );
}

#[test]
fn test_fail_fast_batch_stops_at_first_error() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.csv", "x\n1\n");
    let bad = write(dir.path(), "bad.json", "{not json");
    let c = write(dir.path(), "c.csv", "x\n3\n");
    let out = dir.path().join("out");

    let err = Engine::new()
        .batch_convert(&[&a, &bad, &c], &out, "csv")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(out.join("a.csv").exists());
    assert!(!out.join("c.csv").exists());
}

#[test]
fn test_best_effort_batch_skips_failures() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(dir.path(), "a.csv", "x\n1\n");
    let bad = write(dir.path(), "bad.json", "{not json");
    let c = write(dir.path(), "c.csv", "x\n3\n");
    let out = dir.path().join("out");

    let engine = Engine::with_config(Config::new().with_batch_mode(BatchMode::BestEffort));
    let written = engine.batch_convert(&[&a, &bad, &c], &out, "csv").unwrap();
    assert_eq!(written, vec![out.join("a.csv"), out.join("c.csv")]);

    let report = engine
        .batch_convert_report(&[&a, &bad, &c], &out, "csv")
        .unwrap();
    assert!(!report.is_success());
    assert_eq!(report.converted.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, bad);
    assert_eq!(report.failed[0].1.kind(), ErrorKind::Decode);
}

#[test]
fn test_empty_batch_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("out");
    let sources: [&Path; 0] = [];

    let written = Engine::new().batch_convert(&sources, &out, "json").unwrap();
    assert!(written.is_empty());
    assert!(out.is_dir());
}

#[test]
fn test_parse_and_serialize() {
    let dir = tempfile::tempdir().unwrap();
    let table = Table::new(
        vec!["id".to_string(), "label".to_string()],
        vec![
            row(&[("id", CellValue::Int(1)), ("label", "one".into())]),
            row(&[("id", CellValue::Int(2)), ("label", CellValue::Null)]),
        ],
    )
    .unwrap();

    let engine = Engine::new();
    for name in ["t.json", "t.jsonl", "t.yaml", "t.parquet", "t.arrow", "t.toon", "t.db"] {
        let path = engine.serialize(&table, dir.path().join(name), None).unwrap();
        let back = engine.parse(&path, None).unwrap();
        assert_eq!(back, table, "{}", name);
    }
}

#[test]
fn test_parse_with_explicit_format() {
    let dir = tempfile::tempdir().unwrap();
    let src = write(dir.path(), "data.txt", "a\tb\n1\t2\n");

    let table = Engine::new().parse(&src, Some("tsv")).unwrap();
    assert_eq!(table.columns(), &["a".to_string(), "b".to_string()][..]);
    assert_eq!(table.rows()[0]["b"], CellValue::from("2"));
}

#[test]
fn test_sqlite_named_table_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let src = write(dir.path(), "users.csv", "name,age\nAlice,30\nBob,25\n");
    let db = dir.path().join("users.db");

    let engine = Engine::with_config(Config::new().with_infer_types(true).with_sql_table("users"));
    engine.convert(&src, &db, None).unwrap();

    let table = engine.parse(&db, None).unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.rows()[1]["age"], CellValue::Int(25));

    let missing = Engine::with_config(Config::new().with_sql_table("orders"))
        .parse(&db, None)
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}
