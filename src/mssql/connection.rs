use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tiberius::{Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::TokioAsyncWriteCompatExt;

use super::MssqlClient;
use super::params::bind_query_params;
use super::query::stream_rows;
use crate::config::ExecutorOptions;
use crate::error::DriverError;
use crate::provider::{DbCommand, DbConnection, RowSink, affected_rows, procedure_arguments};
use crate::types::CommandKind;

/// A SQL Server connection owned by a single call.
pub struct MssqlConnection {
    runtime: Arc<Runtime>,
    client: MssqlClient,
    command_timeout: Option<Duration>,
}

impl MssqlConnection {
    /// Connect using an ADO.NET-style connection string
    /// (`server=tcp:host,1433;user=...;password=...;TrustServerCertificate=true`).
    ///
    /// # Errors
    /// Returns the driver error for a malformed string, a failed handshake or
    /// an expired connect timeout.
    pub fn open(
        runtime: Arc<Runtime>,
        connection_string: &str,
        options: &ExecutorOptions,
    ) -> Result<Self, DriverError> {
        let config = Config::from_ado_string(connection_string)?;
        let connect = async move {
            let tcp = TcpStream::connect_named(&config).await?;
            tcp.set_nodelay(true)?;
            Ok::<_, DriverError>(Client::connect(config, tcp.compat_write()).await?)
        };
        let client = block_on_with_timeout(&runtime, options.connect_timeout, connect)?;

        Ok(Self {
            runtime,
            client,
            command_timeout: options.command_timeout,
        })
    }
}

fn block_on_with_timeout<T>(
    runtime: &Runtime,
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, DriverError>>,
) -> Result<T, DriverError> {
    match timeout {
        None => runtime.block_on(fut),
        Some(limit) => runtime.block_on(async {
            tokio::time::timeout(limit, fut).await.map_err(|_| {
                DriverError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("SQL Server operation exceeded {limit:?}"),
                ))
            })?
        }),
    }
}

/// `EXEC name @p = @P1, ...` for procedures; text passes through.
fn command_text(command: &DbCommand) -> String {
    match command.kind() {
        CommandKind::Text => command.text().to_string(),
        CommandKind::StoredProcedure => {
            let args = procedure_arguments(command.params(), "@", " = ", |k| format!("@P{k}"));
            if args.is_empty() {
                format!("EXEC {}", command.text())
            } else {
                format!("EXEC {} {args}", command.text())
            }
        }
    }
}

impl DbConnection for MssqlConnection {
    fn execute(&mut self, command: &DbCommand) -> Result<usize, DriverError> {
        let sql = command_text(command);
        let values = command.bound_values();
        let client = &mut self.client;
        let rows_affected = block_on_with_timeout(&self.runtime, self.command_timeout, async {
            let result = bind_query_params(&sql, &values).execute(client).await?;
            Ok(result.rows_affected().iter().sum::<u64>())
        })?;
        affected_rows(rows_affected)
    }

    fn query(&mut self, command: &DbCommand, sink: &mut dyn RowSink) -> Result<(), DriverError> {
        let sql = command_text(command);
        let values = command.bound_values();
        block_on_with_timeout(
            &self.runtime,
            self.command_timeout,
            stream_rows(&mut self.client, &sql, &values, sink),
        )
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), DriverError> {
        let client = &mut self.client;
        block_on_with_timeout(&self.runtime, self.command_timeout, async {
            client.simple_query(sql).await?.into_results().await?;
            Ok(())
        })
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        let MssqlConnection {
            runtime, client, ..
        } = *self;
        runtime.block_on(client.close())?;
        Ok(())
    }
}
