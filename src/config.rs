use std::time::Duration;

use crate::error::SqlMapperError;
use crate::executor::CommandExecutor;
use crate::types::Dialect;

/// Driver pass-through settings for a [`CommandExecutor`].
///
/// Nothing here is enforced by this crate; each backend hands the values to its
/// driver (`busy_timeout` for `SQLite`, `connect_timeout`/`statement_timeout` for
/// `PostgreSQL`, a handshake timeout for SQL Server).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    pub connect_timeout: Option<Duration>,
    pub command_timeout: Option<Duration>,
}

impl ExecutorOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }
}

/// Fluent builder for a [`CommandExecutor`].
#[derive(Debug, Clone)]
pub struct CommandExecutorBuilder {
    connection_string: String,
    dialect: Dialect,
    opts: ExecutorOptions,
}

impl CommandExecutorBuilder {
    #[must_use]
    pub fn new(connection_string: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            connection_string: connection_string.into(),
            dialect,
            opts: ExecutorOptions::default(),
        }
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.opts.connect_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.opts.command_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn finish(self) -> ExecutorOptions {
        self.opts
    }

    /// Resolve the provider and build the executor.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedDialect` or `ProviderUnavailable` when the dialect
    /// cannot be served by this build.
    pub fn build(self) -> Result<CommandExecutor, SqlMapperError> {
        CommandExecutor::with_options(self.connection_string, self.dialect, self.opts)
    }
}
