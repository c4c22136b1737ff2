use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use tiberius::ColumnData;

use super::MssqlClient;
use super::params::bind_query_params;
use crate::error::DriverError;
use crate::provider::RowSink;
use crate::results::Columns;
use crate::types::RowValues;

/// Run `sql` and stream the first result set into `sink`.
///
/// # Errors
/// Returns the driver error from execution or decoding.
pub async fn stream_rows(
    client: &mut MssqlClient,
    sql: &str,
    values: &[RowValues],
    sink: &mut dyn RowSink,
) -> Result<(), DriverError> {
    let query = bind_query_params(sql, values);
    let mut stream = query.query(client).await?;

    let column_names: Vec<String> = stream
        .columns()
        .await?
        .map(|columns| columns.iter().map(|col| col.name().to_string()).collect())
        .unwrap_or_default();
    let col_count = column_names.len();

    if sink.columns(Arc::new(Columns::new(column_names))).is_break() {
        return Ok(());
    }

    let mut rows = stream.into_row_stream();
    while let Some(row) = rows.try_next().await? {
        let mut row_values = Vec::with_capacity(col_count);
        for (idx, (_column, data)) in row.cells().enumerate().take(col_count) {
            row_values.push(extract_value(&row, idx, data)?);
        }
        if sink.row(row_values).is_break() {
            break;
        }
    }

    Ok(())
}

/// Convert one cell of a tiberius row.
///
/// # Errors
/// Returns `DriverError::Unsupported` for a column type with no `RowValues`
/// counterpart.
pub fn extract_value(
    row: &tiberius::Row,
    idx: usize,
    data: &ColumnData<'_>,
) -> Result<RowValues, DriverError> {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| RowValues::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(RowValues::Int),
        ColumnData::F32(v) => v.map(|v| RowValues::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(RowValues::Float),
        ColumnData::Bit(v) => v.map(RowValues::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| RowValues::Text(s.to_string())),
        ColumnData::Guid(v) => v.as_ref().map(|g| RowValues::Text(g.to_string())),
        ColumnData::Binary(v) => v.as_ref().map(|b| RowValues::Blob(b.to_vec())),
        ColumnData::Numeric(v) => v.as_ref().map(|n| RowValues::Float(numeric_to_f64(n))),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|xml| RowValues::Text(xml.clone().into_owned().into_string())),
        _ => return temporal_value(row, idx),
    };
    Ok(value.unwrap_or(RowValues::Null))
}

#[allow(clippy::cast_precision_loss)]
fn numeric_to_f64(n: &tiberius::numeric::Numeric) -> f64 {
    n.value() as f64 / 10_f64.powi(i32::from(n.scale()))
}

// Date and time columns decode through tiberius' chrono support.
fn temporal_value(row: &tiberius::Row, idx: usize) -> Result<RowValues, DriverError> {
    if let Ok(val) = row.try_get::<NaiveDateTime, usize>(idx) {
        return Ok(val.map_or(RowValues::Null, RowValues::Timestamp));
    }
    if let Ok(val) = row.try_get::<DateTime<Utc>, usize>(idx) {
        return Ok(val.map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc())));
    }
    if let Ok(val) = row.try_get::<NaiveDate, usize>(idx) {
        return Ok(val
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map_or(RowValues::Null, RowValues::Timestamp));
    }
    if let Ok(val) = row.try_get::<NaiveTime, usize>(idx) {
        return Ok(val.map_or(RowValues::Null, |t| {
            RowValues::Text(t.format("%H:%M:%S%.f").to_string())
        }));
    }
    let column_type = row
        .columns()
        .get(idx)
        .map(|col| format!("{:?}", col.column_type()))
        .unwrap_or_default();
    Err(DriverError::Unsupported(format!(
        "SQL Server column {idx} has unsupported type {column_type}"
    )))
}
