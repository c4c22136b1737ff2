use thiserror::Error;

use crate::types::Dialect;

/// Failures reported by a native driver, passed through without interpretation.
#[derive(Debug, Error)]
pub enum DriverError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "mssql")]
    #[error(transparent)]
    Mssql(#[from] tiberius::error::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("affected row count conversion error: {0}")]
    RowCount(#[from] std::num::TryFromIntError),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("{0}")]
    Unsupported(String),
}

#[derive(Debug, Error)]
pub enum SqlMapperError {
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(Dialect),

    #[error("Provider unavailable for {dialect}: {reason}")]
    ProviderUnavailable { dialect: Dialect, reason: String },

    #[error("Driver error ({dialect}): {source}")]
    Driver {
        dialect: Dialect,
        #[source]
        source: DriverError,
    },

    #[error(
        "Type mismatch mapping column `{column}` into `{entity}.{field}`: expected {expected}, found {found}"
    )]
    TypeMismatch {
        entity: &'static str,
        field: &'static str,
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("Query for a single `{entity}` returned no rows")]
    EmptyResult { entity: &'static str },
}

impl SqlMapperError {
    pub(crate) fn driver(dialect: Dialect, source: impl Into<DriverError>) -> Self {
        SqlMapperError::Driver {
            dialect,
            source: source.into(),
        }
    }

    /// The native driver failure, if this error came from one.
    #[must_use]
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            SqlMapperError::Driver { source, .. } => Some(source),
            _ => None,
        }
    }
}
