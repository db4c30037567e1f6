//! Export collaborator (Arrow/Parquet curves, LaTeX matrix table)
//!
//! Curves are flattened into one long-format Arrow batch so any plotting
//! front end can pick `(configuration, metric)` slices out of it. `NoData`
//! entries contribute no rows; absence stays absence.

use crate::matrix::{CellCount, MatrixSummary};
use crate::outcome::Outcome;
use crate::pipeline::CurveEntry;
use crate::series::SECONDS_PER_HOUR;
use crate::{Error, Result};
use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Schema of the curve export batch.
#[must_use]
pub fn curve_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("configuration", DataType::Utf8, false),
        Field::new("metric", DataType::Utf8, false),
        Field::new("seconds", DataType::Float64, false),
        Field::new("hours", DataType::Float64, false),
        Field::new("value", DataType::Float64, false),
    ]))
}

/// Flatten curves into one long-format record batch.
///
/// # Errors
///
/// Returns `EmptyInput` if every entry is `NoData`, or an Arrow error if the
/// batch cannot be assembled.
pub fn curves_to_record_batch(entries: &[CurveEntry]) -> Result<RecordBatch> {
    let mut configuration = Vec::new();
    let mut metric = Vec::new();
    let mut seconds = Vec::new();
    let mut hours = Vec::new();
    let mut value = Vec::new();

    for entry in entries {
        let Outcome::Value(curve) = &entry.curve else {
            continue;
        };
        for (t, v) in curve.points() {
            configuration.push(entry.configuration.name());
            metric.push(entry.metric.as_str());
            seconds.push(t);
            hours.push(t / SECONDS_PER_HOUR);
            value.push(v);
        }
    }

    if value.is_empty() {
        return Err(Error::EmptyInput("no curve has data to export".to_string()));
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(configuration)),
        Arc::new(StringArray::from(metric)),
        Arc::new(Float64Array::from(seconds)),
        Arc::new(Float64Array::from(hours)),
        Arc::new(Float64Array::from(value)),
    ];
    Ok(RecordBatch::try_new(curve_schema(), columns)?)
}

/// Write curves to a Parquet file.
///
/// # Errors
///
/// Returns `EmptyInput` if there is nothing to write and `StorageError` if
/// the file cannot be created or written.
pub fn write_curves_parquet<P: AsRef<Path>>(path: P, entries: &[CurveEntry]) -> Result<()> {
    use parquet::arrow::ArrowWriter;

    let batch = curves_to_record_batch(entries)?;
    let path = path.as_ref();

    let file = File::create(path).map_err(|e| {
        Error::StorageError(format!("Failed to create Parquet file {}: {e}", path.display()))
    })?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .map_err(|e| Error::StorageError(format!("Failed to create Parquet writer: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| Error::StorageError(format!("Failed to write record batch: {e}")))?;
    writer
        .close()
        .map_err(|e| Error::StorageError(format!("Failed to finish Parquet file: {e}")))?;

    info!(file = %path.display(), rows = batch.num_rows(), "wrote curve export");
    Ok(())
}

/// Render the reduced matrix as a LaTeX `tabular`.
///
/// Parsers are numbered from 1; diagonal cells print `-`, every other cell
/// prints its count on a `blue!<intensity>` background.
#[must_use]
pub fn render_matrix_table(summary: &MatrixSummary, column_width: &str) -> String {
    let n = summary.dimension();
    let header: String = (1..=n).map(|i| format!(" & {i}")).collect();

    let mut lines = Vec::with_capacity(n + 4);
    lines.push(format!(
        "\\begin{{tabular}}{{|*{{{}}}{{wc{{{column_width}}}|}}}}",
        n + 1
    ));
    lines.push("\\hline".to_string());
    lines.push(format!("{header} \\\\ \\hline"));

    for (i, row) in summary.rows().enumerate() {
        let cells: String = row
            .iter()
            .map(|cell| match cell.count {
                CellCount::NotApplicable => format!(" & \\cellcolor{{blue!{}}}-", cell.intensity),
                CellCount::Count(c) => format!(" & \\cellcolor{{blue!{}}}{c}", cell.intensity),
            })
            .collect();
        lines.push(format!("{}{cells} \\\\ \\hline", i + 1));
    }

    lines.push("\\end{tabular}".to_string());
    lines.join("\n")
}
