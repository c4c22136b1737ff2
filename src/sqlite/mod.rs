// SQLite backend, driven synchronously through rusqlite.
//
// - connection: per-call connection and the DbConnection impl
// - params: RowValues -> rusqlite values and statement binding
// - query: row extraction and streaming

pub mod connection;
pub mod params;
pub mod query;

pub use connection::SqliteConnection;
pub use query::sqlite_extract_value;

use crate::config::ExecutorOptions;
use crate::error::DriverError;
use crate::provider::{DbConnection, ProviderFactory};
use crate::types::Dialect;

/// Provider for `SQLite`. Stateless: the connection string is the database path.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteProvider;

impl ProviderFactory for SqliteProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn open(
        &self,
        connection_string: &str,
        options: &ExecutorOptions,
    ) -> Result<Box<dyn DbConnection>, DriverError> {
        Ok(Box::new(SqliteConnection::open(connection_string, options)?))
    }
}
