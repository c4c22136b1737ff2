use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{CommandExecutorBuilder, ExecutorOptions};
use crate::error::{DriverError, SqlMapperError};
use crate::mapper::{self, Entity};
use crate::params::Parameter;
use crate::provider::{DbConnection, ProviderFactory, registry};
use crate::results::ResultSet;
use crate::types::{CommandKind, Dialect, Direction, RowValues};

mod cursor;
mod sinks;

pub use cursor::{EntityIter, RowCursor};
use sinks::{ScalarSink, TableSink};

/// Runs parameterized commands against one database through the provider
/// selected for its dialect.
///
/// Each call opens its own connection and closes it before returning, on both
/// the success and the error path. The only exception is
/// [`execute_reader`](Self::execute_reader), whose cursor owns the connection.
/// The executor holds no mutable state, so it can be cloned or shared across
/// threads freely.
///
/// ```rust,no_run
/// use sql_mapper::prelude::*;
///
/// # fn demo() -> Result<(), SqlMapperError> {
/// let db = CommandExecutor::new("students.db", Dialect::Sqlite)?;
/// let params = [db.make_input("name", "Ann")];
/// let affected = db.execute_non_query(
///     "update Student set Sex = 'F' where Name = :name",
///     &params,
///     CommandKind::Text,
/// )?;
/// # let _ = affected;
/// # Ok(()) }
/// ```
#[derive(Clone)]
pub struct CommandExecutor {
    connection_string: String,
    dialect: Dialect,
    provider: Arc<dyn ProviderFactory>,
    options: ExecutorOptions,
}

impl fmt::Debug for CommandExecutor {
    // The connection string may carry credentials.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("dialect", &self.dialect)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CommandExecutor {
    /// Resolve the provider for `dialect`. Does not connect.
    ///
    /// # Errors
    /// Returns `UnsupportedDialect` for a dialect without a provider and
    /// `ProviderUnavailable` when the provider cannot be constructed.
    pub fn new(connection_string: impl Into<String>, dialect: Dialect) -> Result<Self, SqlMapperError> {
        Self::with_options(connection_string, dialect, ExecutorOptions::default())
    }

    /// Like [`new`](Self::new), with driver pass-through options.
    ///
    /// # Errors
    /// See [`new`](Self::new).
    pub fn with_options(
        connection_string: impl Into<String>,
        dialect: Dialect,
        options: ExecutorOptions,
    ) -> Result<Self, SqlMapperError> {
        let provider = registry::resolve(dialect)?;
        Ok(Self {
            connection_string: connection_string.into(),
            dialect,
            provider,
            options,
        })
    }

    #[must_use]
    pub fn builder(connection_string: impl Into<String>, dialect: Dialect) -> CommandExecutorBuilder {
        CommandExecutorBuilder::new(connection_string, dialect)
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// Build a parameter through the provider.
    #[must_use]
    pub fn make_parameter(
        &self,
        name: &str,
        direction: Direction,
        value: impl Into<RowValues>,
    ) -> Parameter {
        self.provider.create_parameter(name, direction, value.into())
    }

    /// Shorthand for an [`Direction::Input`] parameter.
    #[must_use]
    pub fn make_input(&self, name: &str, value: impl Into<RowValues>) -> Parameter {
        self.make_parameter(name, Direction::Input, value)
    }

    /// Execute a statement and return the number of affected rows.
    ///
    /// # Errors
    /// Returns `SqlMapperError::Driver` for any failure of the native driver.
    pub fn execute_non_query(
        &self,
        sql: &str,
        params: &[Parameter],
        kind: CommandKind,
    ) -> Result<usize, SqlMapperError> {
        let command = self
            .provider
            .create_command(sql, kind, params)
            .map_err(|e| self.driver_error(e))?;
        let affected = self.with_connection(|conn| conn.execute(&command))?;
        debug!(dialect = %self.dialect, ?kind, params = params.len(), affected, "execute_non_query");
        Ok(affected)
    }

    /// Execute a query and return a cursor over its rows. The cursor owns the
    /// connection and releases it when exhausted, closed or dropped.
    ///
    /// # Errors
    /// Returns `SqlMapperError::Driver` when connecting or starting the query
    /// fails; later failures surface through the cursor.
    pub fn execute_reader(
        &self,
        sql: &str,
        params: &[Parameter],
        kind: CommandKind,
    ) -> Result<RowCursor, SqlMapperError> {
        let command = self
            .provider
            .create_command(sql, kind, params)
            .map_err(|e| self.driver_error(e))?;
        let cursor = RowCursor::open(
            Arc::clone(&self.provider),
            self.connection_string.clone(),
            self.options.clone(),
            command,
        )?;
        debug!(dialect = %self.dialect, ?kind, params = params.len(), columns = cursor.columns().len(), "execute_reader");
        Ok(cursor)
    }

    /// Execute a query and materialize every row.
    ///
    /// # Errors
    /// Returns `SqlMapperError::Driver` for any failure of the native driver.
    pub fn execute_table(
        &self,
        sql: &str,
        params: &[Parameter],
        kind: CommandKind,
    ) -> Result<ResultSet, SqlMapperError> {
        let command = self
            .provider
            .create_command(sql, kind, params)
            .map_err(|e| self.driver_error(e))?;
        let mut sink = TableSink::default();
        self.with_connection(|conn| conn.query(&command, &mut sink))?;
        let result = sink.into_result_set();
        debug!(dialect = %self.dialect, ?kind, params = params.len(), rows = result.len(), "execute_table");
        Ok(result)
    }

    /// First column of the first row; `None` when the query returned no rows.
    /// A SQL NULL in that cell is `Some(RowValues::Null)`.
    ///
    /// # Errors
    /// Returns `SqlMapperError::Driver` for any failure of the native driver.
    pub fn execute_scalar(
        &self,
        sql: &str,
        params: &[Parameter],
        kind: CommandKind,
    ) -> Result<Option<RowValues>, SqlMapperError> {
        let command = self
            .provider
            .create_command(sql, kind, params)
            .map_err(|e| self.driver_error(e))?;
        let mut sink = ScalarSink::default();
        self.with_connection(|conn| conn.query(&command, &mut sink))?;
        let value = sink.into_value();
        debug!(dialect = %self.dialect, ?kind, params = params.len(), found = value.is_some(), "execute_scalar");
        Ok(value)
    }

    /// Execute a query and map every row onto `E`.
    ///
    /// # Errors
    /// Returns `SqlMapperError::Driver` from the query and
    /// `SqlMapperError::TypeMismatch` from mapping.
    pub fn query_for_entities<E: Entity>(
        &self,
        sql: &str,
        params: &[Parameter],
        kind: CommandKind,
    ) -> Result<Vec<E>, SqlMapperError> {
        let result = self.execute_table(sql, params, kind)?;
        mapper::map_rows(&result)
    }

    /// Execute a query and map its first row onto `E`.
    ///
    /// # Errors
    /// Returns `SqlMapperError::EmptyResult` when the query returned no rows,
    /// plus everything [`query_for_entities`](Self::query_for_entities) returns.
    pub fn query_for_entity<E: Entity>(
        &self,
        sql: &str,
        params: &[Parameter],
        kind: CommandKind,
    ) -> Result<E, SqlMapperError> {
        let result = self.execute_table(sql, params, kind)?;
        mapper::first_entity(&result)
    }

    /// Run a parameterless script of one or more statements.
    ///
    /// # Errors
    /// Returns `SqlMapperError::Driver` for any failure of the native driver.
    pub fn execute_batch(&self, sql: &str) -> Result<(), SqlMapperError> {
        self.with_connection(|conn| conn.execute_batch(sql))?;
        debug!(dialect = %self.dialect, "execute_batch");
        Ok(())
    }

    fn driver_error(&self, source: DriverError) -> SqlMapperError {
        SqlMapperError::driver(self.dialect, source)
    }

    /// Open a connection, run `f`, and close the connection before returning
    /// whatever happened.
    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut dyn DbConnection) -> Result<T, DriverError>,
    ) -> Result<T, SqlMapperError> {
        let mut conn = self
            .provider
            .open(&self.connection_string, &self.options)
            .map_err(|e| self.driver_error(e))?;
        let outcome = f(conn.as_mut());
        let closed = conn.close();
        settle(self.dialect, outcome, closed)
    }
}

/// Combine the result of a call with the result of closing its connection.
/// A call failure wins over a close failure, which is only logged.
pub(crate) fn settle<T>(
    dialect: Dialect,
    outcome: Result<T, DriverError>,
    closed: Result<(), DriverError>,
) -> Result<T, SqlMapperError> {
    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(SqlMapperError::driver(dialect, close_err)),
        (Err(err), Ok(())) => Err(SqlMapperError::driver(dialect, err)),
        (Err(err), Err(close_err)) => {
            warn!(%dialect, error = %close_err, "failed to close connection after error");
            Err(SqlMapperError::driver(dialect, err))
        }
    }
}
