// SQL Server backend over tiberius, driven on a current-thread runtime.
//
// - connection: per-call connection and the DbConnection impl
// - params: positional binding onto tiberius queries
// - query: cell extraction and streaming

pub mod connection;
pub mod params;
pub mod query;

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::runtime::{Builder, Runtime};
use tokio_util::compat::Compat;

pub use connection::MssqlConnection;

use crate::config::ExecutorOptions;
use crate::error::DriverError;
use crate::params::Parameter;
use crate::provider::{DbCommand, DbConnection, ProviderFactory};
use crate::translation::{PlaceholderStyle, bind_named_placeholders};
use crate::types::{CommandKind, Dialect};

/// Type alias for the SQL Server client used by this backend.
pub type MssqlClient = tiberius::Client<Compat<TcpStream>>;

#[derive(Debug, Clone)]
pub struct MssqlProvider {
    runtime: Arc<Runtime>,
}

impl MssqlProvider {
    /// # Errors
    /// Returns the I/O error raised while building the runtime.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            runtime: current_thread_runtime()?,
        })
    }
}

fn current_thread_runtime() -> std::io::Result<Arc<Runtime>> {
    Ok(Arc::new(Builder::new_current_thread().enable_all().build()?))
}

impl ProviderFactory for MssqlProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Mssql
    }

    fn open(
        &self,
        connection_string: &str,
        options: &ExecutorOptions,
    ) -> Result<Box<dyn DbConnection>, DriverError> {
        Ok(Box::new(MssqlConnection::open(
            Arc::clone(&self.runtime),
            connection_string,
            options,
        )?))
    }

    // A cursor blocks inside its driver future while the consumer is not
    // reading, so it must not hold the runtime shared by other calls.
    fn open_detached(
        &self,
        connection_string: &str,
        options: &ExecutorOptions,
    ) -> Result<Box<dyn DbConnection>, DriverError> {
        Ok(Box::new(MssqlConnection::open(
            current_thread_runtime()?,
            connection_string,
            options,
        )?))
    }

    fn create_command(
        &self,
        sql: &str,
        kind: CommandKind,
        params: &[Parameter],
    ) -> Result<DbCommand, DriverError> {
        match kind {
            CommandKind::Text => {
                let text = bind_named_placeholders(sql, params, PlaceholderStyle::Mssql);
                Ok(DbCommand::new(text, kind, params.to_vec()))
            }
            CommandKind::StoredProcedure => DbCommand::checked(sql, kind, params),
        }
    }
}
