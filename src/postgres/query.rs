use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures_util::{TryStreamExt, pin_mut};
use serde_json::Value;
use tokio_postgres::Client;

use crate::provider::RowSink;
use crate::results::Columns;
use crate::types::RowValues;

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns the driver error if the column cannot be decoded.
pub fn postgres_extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<RowValues, tokio_postgres::Error> {
    let type_info = row.columns()[idx].type_();

    Ok(match type_info.name() {
        "int2" => {
            let val: Option<i16> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v)))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Int)
        }
        "float4" => {
            let val: Option<f32> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v)))
        }
        "float8" => {
            let val: Option<f64> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Float)
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Bool)
        }
        "timestamp" => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Timestamp)
        }
        "timestamptz" => {
            let val: Option<DateTime<Utc>> = row.try_get(idx)?;
            val.map_or(RowValues::Null, |v| RowValues::Timestamp(v.naive_utc()))
        }
        "date" => {
            let val: Option<NaiveDate> = row.try_get(idx)?;
            val.and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(RowValues::Null, RowValues::Timestamp)
        }
        "json" | "jsonb" => {
            let val: Option<Value> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::JSON)
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Blob)
        }
        // text, varchar, bpchar, name and anything else that decodes as a string
        _ => {
            let val: Option<String> = row.try_get(idx)?;
            val.map_or(RowValues::Null, RowValues::Text)
        }
    })
}

/// Prepare `sql`, bind `values` positionally and stream the result into `sink`.
///
/// # Errors
/// Returns the driver error from preparation, execution or decoding.
pub async fn stream_rows(
    client: &Client,
    sql: &str,
    values: &[RowValues],
    sink: &mut dyn RowSink,
) -> Result<(), tokio_postgres::Error> {
    let stmt = client.prepare(sql).await?;
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    if sink.columns(Arc::new(Columns::new(column_names))).is_break() {
        return Ok(());
    }

    let rows = client.query_raw(&stmt, values.iter()).await?;
    pin_mut!(rows);
    while let Some(row) = rows.try_next().await? {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(&row, idx)?);
        }
        if sink.row(row_values).is_break() {
            break;
        }
    }

    Ok(())
}
