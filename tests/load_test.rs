//! File-level tests for the session/matrix loaders and the Parquet export

use arrow::array::{Float64Array, StringArray};
use fuzz_stats::export::{render_matrix_table, write_curves_parquet};
use fuzz_stats::load::{load_matrix_file, load_session_files, ParserCatalog};
use fuzz_stats::matrix;
use fuzz_stats::session::{ParserIndex, ParserPair};
use fuzz_stats::{pipeline, Error, RejectionKind, StatsConfig};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

const SESSION_A: &str = r#"{
    "argmax_ucb": false,
    "byte_mutation_only": false,
    "iterations": [
        {"input_count": 10, "corpus_size": 2, "incons_count": 0, "seconds_used": 0.0},
        {"input_count": 90, "corpus_size": 5, "incons_count": 1, "seconds_used": 30.0}
    ],
    "consistent_pairs": [["7z", "libzip"], ["7z", "go"]]
}"#;

const SESSION_B: &str = r#"{
    "iterations": [
        {"input_count": 40, "corpus_size": 3, "incons_count": 2, "seconds_used": 12.0}
    ],
    "consistent_pairs": [["libzip", "7z"]]
}"#;

// ============================================================================
// Session files
// ============================================================================

#[test]
fn test_load_session_files_skips_bad_files() {
    let dir = TempDir::new().unwrap();
    let good_a = write_file(&dir, "a.json", SESSION_A);
    let broken = write_file(&dir, "broken.json", "{ not json");
    let missing_time = write_file(
        &dir,
        "missing.json",
        r#"{"iterations": [{"incons_count": 1}], "consistent_pairs": []}"#,
    );
    let good_b = write_file(&dir, "b.json", SESSION_B);
    let absent = dir.path().join("absent.json");

    let mut catalog = ParserCatalog::new();
    let loaded = load_session_files([&good_a, &broken, &missing_time, &good_b, &absent], &mut catalog);

    assert_eq!(loaded.sessions.len(), 2);
    assert_eq!(loaded.rejected.len(), 3);
    assert_eq!(loaded.rejected[0].kind, RejectionKind::Unreadable);
    assert_eq!(loaded.rejected[1].kind, RejectionKind::Malformed);
    assert_eq!(loaded.rejected[2].kind, RejectionKind::Unreadable);

    // names shared across files resolve to the same index
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.name(ParserIndex(0)), Some("7z"));
    let pair = ParserPair::new(0, 1);
    assert!(loaded.sessions[0].consistent_pairs().contains(&pair));
    assert!(loaded.sessions[1].consistent_pairs().contains(&pair));
}

#[test]
fn test_loaded_sessions_reduce_end_to_end() {
    let dir = TempDir::new().unwrap();
    let paths = [
        write_file(&dir, "a.json", SESSION_A),
        write_file(&dir, "b.json", SESSION_B),
    ];
    let loaded = load_session_files(&paths, &mut ParserCatalog::new());

    let config = StatsConfig::builder()
        .horizon_seconds(60.0)
        .grid_points(3)
        .metrics(["incons_count", "corpus_size"])
        .build()
        .unwrap();
    let report = pipeline::run(&loaded.sessions, &config).unwrap();

    assert_eq!(report.total_pairs, 3);
    assert!(report.rejected.is_empty());
    let global = report.consistency.global.value().unwrap();
    assert_eq!(global.overall, 2);
    assert_eq!(global.per_session, vec![1, 2]);
}

#[test]
fn test_config_file_defaults_missing_keys() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "config.json",
        r#"{"grid": {"horizon_seconds": 3600.0, "points": 10}, "universe_policy": "trust_first"}"#,
    );
    let config = StatsConfig::from_json_file(&path).unwrap();
    assert_eq!(config.grid.points, 10);
    assert_eq!(config.metrics, vec!["incons_count".to_string()]);
    assert_eq!(config.matrix_column_width, "-2.5pt");
}

#[test]
fn test_config_file_rejects_zero_points() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "config.json", r#"{"grid": {"horizon_seconds": 1.0, "points": 0}}"#);
    assert!(matches!(
        StatsConfig::from_json_file(&path),
        Err(Error::InvalidConfig(_))
    ));
}

// ============================================================================
// Matrix files
// ============================================================================

#[test]
fn test_matrix_file_to_table() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "matrix.json",
        r#"[
            {"inconsistency_types": []},
            {"inconsistency_types": ["crc", "name", "size"]},
            {"inconsistency_types": ["crc", "name", "size"]},
            {"inconsistency_types": []}
        ]"#,
    );
    let m = load_matrix_file(&path, None).unwrap();
    let config = StatsConfig::default();
    let summary = matrix::reduce(&m, &config.intensity);
    assert_eq!(summary.total_types(), 3);
    assert_eq!(summary.total_pairs(), 1);

    let table = render_matrix_table(&summary, &config.matrix_column_width);
    assert!(table.contains("1 & \\cellcolor{blue!0}- & \\cellcolor{blue!19}3"));
}

#[test]
fn test_matrix_file_dimension_mismatch() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "matrix.json", r#"[{}, {}, {}, {}]"#);
    assert!(matches!(
        load_matrix_file(&path, Some(3)),
        Err(Error::MalformedInput(_))
    ));
}

// ============================================================================
// Parquet export
// ============================================================================

#[test]
fn test_write_curves_parquet_round_trip() {
    let dir = TempDir::new().unwrap();
    let paths = [write_file(&dir, "a.json", SESSION_A)];
    let loaded = load_session_files(&paths, &mut ParserCatalog::new());
    let config = StatsConfig::builder()
        .horizon_seconds(30.0)
        .grid_points(4)
        .build()
        .unwrap();
    let report = pipeline::run(&loaded.sessions, &config).unwrap();

    let out = dir.path().join("curves.parquet");
    write_curves_parquet(&out, &report.curves).unwrap();

    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&out).unwrap())
        .unwrap()
        .build()
        .unwrap();
    let batches: Vec<_> = reader.map(Result::unwrap).collect();
    let rows: usize = batches.iter().map(arrow::array::RecordBatch::num_rows).sum();
    assert_eq!(rows, 4);

    let batch = &batches[0];
    let config_col = batch
        .column(0)
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(config_col.value(0), "full");
    let values = batch
        .column(4)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert!((values.value(3) - 1.0).abs() < f64::EPSILON);
}
