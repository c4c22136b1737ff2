use std::fmt;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Values that can be stored in a database row or used as command parameters.
///
/// The same enum is shared by every backend so callers never touch driver types:
/// ```rust
/// use sql_mapper::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // "YYYY-MM-DD HH:MM:SS" with optional fraction
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(dt);
            }
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                return Some(dt.naive_utc());
            }
        }
        None
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Short name of the variant, used in conversion diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            RowValues::Int(_) => "integer",
            RowValues::Float(_) => "float",
            RowValues::Text(_) => "text",
            RowValues::Bool(_) => "boolean",
            RowValues::Timestamp(_) => "timestamp",
            RowValues::Null => "null",
            RowValues::JSON(_) => "json",
            RowValues::Blob(_) => "blob",
        }
    }
}

impl fmt::Display for RowValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValues::Int(i) => write!(f, "{i}"),
            RowValues::Float(v) => write!(f, "{v}"),
            RowValues::Text(s) => write!(f, "{s:?}"),
            RowValues::Bool(b) => write!(f, "{b}"),
            RowValues::Timestamp(dt) => write!(f, "{}", dt.format("%F %T%.f")),
            RowValues::Null => f.write_str("NULL"),
            RowValues::JSON(v) => write!(f, "{v}"),
            RowValues::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// The database dialects this layer knows about.
///
/// The enumeration is closed and does not depend on cargo features; whether a
/// dialect can actually be used is decided by the provider registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lower")]
pub enum Dialect {
    /// SQL Server
    Mssql,
    /// `MySQL`
    MySql,
    /// `SQLite`
    Sqlite,
    /// Oracle
    Oracle,
    /// ODBC bridge
    Odbc,
    /// OLE DB bridge
    OleDb,
    /// Firebird
    Firebird,
    /// `PostgreSQL`
    Postgres,
    /// IBM DB2
    Db2,
    /// Informix
    Informix,
    /// SQL Server Compact
    SqlServerCe,
}

impl Dialect {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Mssql => "mssql",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::Oracle => "oracle",
            Dialect::Odbc => "odbc",
            Dialect::OleDb => "oledb",
            Dialect::Firebird => "firebird",
            Dialect::Postgres => "postgres",
            Dialect::Db2 => "db2",
            Dialect::Informix => "informix",
            Dialect::SqlServerCe => "sqlserverce",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the SQL payload of a command is interpreted by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CommandKind {
    /// Literal SQL text.
    #[default]
    Text,
    /// The payload names a stored procedure to invoke with the bound parameters.
    StoredProcedure,
}

/// Direction of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Input,
    Output,
    InputOutput,
}

impl Direction {
    /// Whether the caller's value is sent to the driver.
    #[must_use]
    pub fn carries_value(self) -> bool {
        matches!(self, Direction::Input | Direction::InputOutput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_accepts_zero_and_one() {
        assert_eq!(RowValues::Int(1).as_bool(), Some(&true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(&false));
        assert_eq!(RowValues::Int(2).as_bool(), None);
    }

    #[test]
    fn timestamps_parse_from_text() {
        let v = RowValues::Text("2024-02-03 04:05:06".into());
        let dt = v.as_timestamp().unwrap();
        assert_eq!(dt.format("%F %T").to_string(), "2024-02-03 04:05:06");

        let v = RowValues::Text("2024-02-03T04:05:06.250Z".into());
        assert!(v.as_timestamp().is_some());

        assert!(RowValues::Text("yesterday".into()).as_timestamp().is_none());
    }

    #[test]
    fn option_into_row_values() {
        let none: Option<i64> = None;
        assert_eq!(RowValues::from(none), RowValues::Null);
        assert_eq!(RowValues::from(Some("x")), RowValues::Text("x".into()));
    }

    #[test]
    fn dialect_names_are_stable() {
        assert_eq!(Dialect::Postgres.to_string(), "postgres");
        assert_eq!(
            serde_json::to_string(&Dialect::SqlServerCe).unwrap(),
            "\"sqlserverce\""
        );
        let parsed: Dialect = serde_json::from_str("\"sqlite\"").unwrap();
        assert_eq!(parsed, Dialect::Sqlite);
        assert_eq!(Dialect::from_str("sqlserverce", true).unwrap(), Dialect::SqlServerCe);
        assert_eq!(Dialect::from_str("MySql", true).unwrap(), Dialect::MySql);
    }
}
