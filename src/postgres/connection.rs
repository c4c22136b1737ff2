use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, NoTls};
use tracing::warn;

use super::query::stream_rows;
use crate::config::ExecutorOptions;
use crate::error::DriverError;
use crate::provider::{DbCommand, DbConnection, RowSink, affected_rows, procedure_arguments};
use crate::types::CommandKind;

/// A `PostgreSQL` connection owned by a single call. Every driver future is
/// driven to completion on the provider's runtime.
pub struct PostgresConnection {
    runtime: Arc<Runtime>,
    client: Client,
    driver: JoinHandle<()>,
}

impl PostgresConnection {
    /// Connect using a key/value or URL connection string.
    ///
    /// # Errors
    /// Returns the driver error for a malformed string or a failed connect.
    pub fn open(
        runtime: Arc<Runtime>,
        connection_string: &str,
        options: &ExecutorOptions,
    ) -> Result<Self, DriverError> {
        let mut config: Config = connection_string.parse()?;
        if let Some(timeout) = options.connect_timeout {
            config.connect_timeout(timeout);
        }
        if let Some(timeout) = options.command_timeout {
            config.options(&format!("-c statement_timeout={}", timeout.as_millis()));
        }

        let (client, connection) = runtime.block_on(config.connect(NoTls))?;
        let driver = runtime.spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "postgres connection terminated with an error");
            }
        });

        Ok(Self {
            runtime,
            client,
            driver,
        })
    }
}

/// `CALL name(...)` for statements, `SELECT * FROM name(...)` for rows.
fn command_text(command: &DbCommand, returns_rows: bool) -> String {
    match command.kind() {
        CommandKind::Text => command.text().to_string(),
        CommandKind::StoredProcedure => {
            let args = procedure_arguments(command.params(), "", " => ", |k| format!("${k}"));
            if returns_rows {
                format!("SELECT * FROM {}({args})", command.text())
            } else {
                format!("CALL {}({args})", command.text())
            }
        }
    }
}

impl DbConnection for PostgresConnection {
    fn execute(&mut self, command: &DbCommand) -> Result<usize, DriverError> {
        let sql = command_text(command, false);
        let values = command.bound_values();
        let refs: Vec<&(dyn ToSql + Sync)> =
            values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        let rows = self.runtime.block_on(self.client.execute(sql.as_str(), &refs))?;
        affected_rows(rows)
    }

    fn query(&mut self, command: &DbCommand, sink: &mut dyn RowSink) -> Result<(), DriverError> {
        let sql = command_text(command, true);
        let values = command.bound_values();
        self.runtime
            .block_on(stream_rows(&self.client, &sql, &values, sink))?;
        Ok(())
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), DriverError> {
        self.runtime.block_on(self.client.batch_execute(sql))?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        let PostgresConnection {
            runtime,
            client,
            driver,
        } = *self;
        // Dropping the client ends the connection task; wait for it so the
        // socket is closed before returning.
        drop(client);
        runtime
            .block_on(driver)
            .map_err(|e| DriverError::Io(std::io::Error::other(e)))
    }
}
