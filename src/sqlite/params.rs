use rusqlite::Statement;
use rusqlite::types::Value;

use crate::params::Parameter;
use crate::types::RowValues;

/// Convert a single `RowValues` to a rusqlite `Value`.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Bind `params` onto a prepared statement.
///
/// Named parameters bind by name, trying the `:name`, `@name` and `$name`
/// spellings `SQLite` accepts. Unnamed parameters bind at their 1-based
/// position in the list.
///
/// # Errors
/// Returns `InvalidParameterName` when a name does not occur in the statement
/// and `InvalidParameterCount` when a position is past the statement's last
/// parameter.
pub fn bind_parameters(stmt: &mut Statement<'_>, params: &[Parameter]) -> rusqlite::Result<()> {
    let expected = stmt.parameter_count();
    for (position, param) in params.iter().enumerate() {
        let index = if param.is_named() {
            named_index(stmt, param.name())?
                .ok_or_else(|| rusqlite::Error::InvalidParameterName(param.name().to_string()))?
        } else if position < expected {
            position + 1
        } else {
            return Err(rusqlite::Error::InvalidParameterCount(position + 1, expected));
        };
        stmt.raw_bind_parameter(index, row_value_to_sqlite_value(param.bound_value()))?;
    }
    Ok(())
}

fn named_index(stmt: &Statement<'_>, name: &str) -> rusqlite::Result<Option<usize>> {
    for prefix in [':', '@', '$'] {
        if let Some(index) = stmt.parameter_index(&format!("{prefix}{name}"))? {
            return Ok(Some(index));
        }
    }
    Ok(None)
}
