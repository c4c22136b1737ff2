//! The capability each dialect provides, and the static table that selects one.
//!
//! A [`ProviderFactory`] opens connections, prepares commands and builds
//! parameters for exactly one [`Dialect`]. A [`DbConnection`] lives for one
//! logical call and streams rows into a [`RowSink`].

use std::fmt;
use std::ops::ControlFlow;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::config::ExecutorOptions;
use crate::error::DriverError;
use crate::params::{self, Parameter};
use crate::results::Columns;
use crate::types::{CommandKind, Dialect, Direction, RowValues};

pub mod registry;

// Dotted names of up to four parts; each part bare, "quoted" or [bracketed].
static PROCEDURE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(?:[A-Za-z_][A-Za-z0-9_$#]*|"[^"]+"|\[[^\]]+\])(?:\.(?:[A-Za-z_][A-Za-z0-9_$#]*|"[^"]+"|\[[^\]]+\])){0,3}$"#,
    )
    .expect("procedure name pattern is valid")
});

/// A command prepared for one dialect: final SQL text (or procedure name) and
/// the parameters in binding order.
#[derive(Debug, Clone, PartialEq)]
pub struct DbCommand {
    text: String,
    kind: CommandKind,
    params: Vec<Parameter>,
}

impl DbCommand {
    #[must_use]
    pub fn new(text: impl Into<String>, kind: CommandKind, params: Vec<Parameter>) -> Self {
        Self {
            text: text.into(),
            kind,
            params,
        }
    }

    /// Build a command, checking that stored-procedure names are plain
    /// (optionally qualified) identifiers since they are spliced into SQL.
    ///
    /// # Errors
    /// Returns `DriverError::InvalidCommand` for a malformed procedure name.
    pub fn checked(sql: &str, kind: CommandKind, params: &[Parameter]) -> Result<Self, DriverError> {
        let text = match kind {
            CommandKind::Text => sql,
            CommandKind::StoredProcedure => {
                let name = sql.trim();
                if !PROCEDURE_NAME.is_match(name) {
                    return Err(DriverError::InvalidCommand(format!(
                        "`{name}` is not a valid stored procedure name"
                    )));
                }
                name
            }
        };
        Ok(Self::new(text, kind, params.to_vec()))
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    #[must_use]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Values to hand to a positional driver, in declaration order.
    #[must_use]
    pub fn bound_values(&self) -> Vec<RowValues> {
        params::bound_values(&self.params)
    }
}

/// Receives the output of [`DbConnection::query`]: the column names once, then
/// each row. Returning `Break` stops the driver from producing more rows.
pub trait RowSink {
    fn columns(&mut self, columns: Arc<Columns>) -> ControlFlow<()>;

    fn row(&mut self, values: Vec<RowValues>) -> ControlFlow<()>;
}

/// One open native connection. Created per call and closed by the caller.
pub trait DbConnection {
    /// Run a statement that returns no rows; yields the affected-row count.
    ///
    /// # Errors
    /// Returns the native driver failure.
    fn execute(&mut self, command: &DbCommand) -> Result<usize, DriverError>;

    /// Run a row-returning statement, feeding `sink` until it breaks or the
    /// rows run out.
    ///
    /// # Errors
    /// Returns the native driver failure.
    fn query(&mut self, command: &DbCommand, sink: &mut dyn RowSink) -> Result<(), DriverError>;

    /// Run a script of one or more statements without parameters.
    ///
    /// # Errors
    /// Returns the native driver failure.
    fn execute_batch(&mut self, sql: &str) -> Result<(), DriverError>;

    /// Release the native connection.
    ///
    /// # Errors
    /// Returns the native driver failure raised while closing.
    fn close(self: Box<Self>) -> Result<(), DriverError>;
}

/// Everything dialect-specific sits behind this trait; the executor selects
/// one implementation at construction and never branches on the dialect again.
pub trait ProviderFactory: Send + Sync + fmt::Debug {
    fn dialect(&self) -> Dialect;

    /// Open a fresh native connection.
    ///
    /// # Errors
    /// Returns the native driver failure (bad connection string, unreachable server, ...).
    fn open(
        &self,
        connection_string: &str,
        options: &ExecutorOptions,
    ) -> Result<Box<dyn DbConnection>, DriverError>;

    /// Open a connection that is driven independently of every other call
    /// through this provider, for use by a long-lived cursor. Providers that
    /// share a runtime between calls give this connection its own.
    ///
    /// # Errors
    /// Returns the native driver failure, or the I/O error raised while
    /// starting the runtime.
    fn open_detached(
        &self,
        connection_string: &str,
        options: &ExecutorOptions,
    ) -> Result<Box<dyn DbConnection>, DriverError> {
        self.open(connection_string, options)
    }

    /// Prepare the command text for this dialect's driver.
    ///
    /// # Errors
    /// Returns `DriverError::InvalidCommand` when the command cannot be expressed.
    fn create_command(
        &self,
        sql: &str,
        kind: CommandKind,
        params: &[Parameter],
    ) -> Result<DbCommand, DriverError> {
        DbCommand::checked(sql, kind, params)
    }

    fn create_parameter(&self, name: &str, direction: Direction, value: RowValues) -> Parameter {
        Parameter::new(name, direction, value)
    }
}

/// Render a stored-procedure argument list. Named parameters become
/// `{name_prefix}{name}{assign}{placeholder}`; unnamed ones are positional.
pub(crate) fn procedure_arguments(
    params: &[Parameter],
    name_prefix: &str,
    assign: &str,
    placeholder: impl Fn(usize) -> String,
) -> String {
    params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if p.is_named() {
                format!("{name_prefix}{}{assign}{}", p.name(), placeholder(i + 1))
            } else {
                placeholder(i + 1)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convert a driver's affected-row count.
///
/// # Errors
/// Returns `DriverError::RowCount` when the count does not fit in `usize`.
pub(crate) fn affected_rows(count: u64) -> Result<usize, DriverError> {
    Ok(usize::try_from(count)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedure_names_are_validated() {
        for ok in [
            "usp_add",
            "dbo.usp_add",
            "[dbo].[Add Student]",
            "\"public\".\"add\"",
            "db.dbo.p#1",
        ] {
            assert!(
                DbCommand::checked(ok, CommandKind::StoredProcedure, &[]).is_ok(),
                "{ok}"
            );
        }
        for bad in ["", "drop table x; --", "a.b.c.d.e", "1abc", "p(1)"] {
            assert!(
                matches!(
                    DbCommand::checked(bad, CommandKind::StoredProcedure, &[]),
                    Err(DriverError::InvalidCommand(_))
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn text_commands_are_not_validated() {
        let cmd = DbCommand::checked("select 1; select 2", CommandKind::Text, &[]).unwrap();
        assert_eq!(cmd.text(), "select 1; select 2");
    }

    #[test]
    fn affected_row_counts_convert_or_fail() {
        assert_eq!(affected_rows(3).unwrap(), 3);
        let overflow = u8::try_from(300_u16).unwrap_err();
        let err = DriverError::from(overflow);
        assert!(matches!(err, DriverError::RowCount(_)));
        assert!(err.to_string().starts_with("affected row count conversion error"));
    }

    #[test]
    fn procedure_arguments_mix_named_and_positional() {
        let params = vec![
            Parameter::new("@name", Direction::Input, RowValues::Text("Ann".into())),
            Parameter::positional(3_i64),
        ];
        let args = procedure_arguments(&params, "", " => ", |k| format!("${k}"));
        assert_eq!(args, "name => $1, $2");
        let args = procedure_arguments(&params, "@", " = ", |k| format!("@P{k}"));
        assert_eq!(args, "@name = @P1, @P2");
    }
}
