use std::ops::ControlFlow;
use std::sync::Arc;

use rusqlite::Statement;
use rusqlite::types::Value;

use crate::provider::RowSink;
use crate::results::Columns;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns the rusqlite error if the value cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<RowValues> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Step a statement whose parameters are already bound, streaming its columns
/// and rows into `sink`.
///
/// # Errors
/// Returns the rusqlite error raised while stepping or reading values.
pub fn stream_rows(stmt: &mut Statement<'_>, sink: &mut dyn RowSink) -> rusqlite::Result<()> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    if sink.columns(Arc::new(Columns::new(column_names))).is_break() {
        return Ok(());
    }

    let mut rows = stmt.raw_query();
    while let Some(row) = rows.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value(row, i)?);
        }
        if let ControlFlow::Break(()) = sink.row(row_values) {
            break;
        }
    }

    Ok(())
}
