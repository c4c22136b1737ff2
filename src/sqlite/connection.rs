use rusqlite::{Connection, OpenFlags};

use super::params::bind_parameters;
use super::query::stream_rows;
use crate::config::ExecutorOptions;
use crate::error::DriverError;
use crate::provider::{DbCommand, DbConnection, RowSink};
use crate::types::CommandKind;

/// A `SQLite` connection owned by a single call.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    /// Open `path` (a file path, `:memory:`, or a `file:` URI).
    ///
    /// # Errors
    /// Returns the rusqlite error when the database cannot be opened.
    pub fn open(path: &str, options: &ExecutorOptions) -> Result<Self, DriverError> {
        let conn = Connection::open_with_flags(path, OpenFlags::default())?;
        if let Some(timeout) = options.command_timeout {
            conn.busy_timeout(timeout)?;
        }
        Ok(Self { conn })
    }
}

fn reject_procedures(command: &DbCommand) -> Result<(), DriverError> {
    match command.kind() {
        CommandKind::Text => Ok(()),
        CommandKind::StoredProcedure => Err(DriverError::Unsupported(
            "SQLite does not support stored procedures".to_string(),
        )),
    }
}

impl DbConnection for SqliteConnection {
    fn execute(&mut self, command: &DbCommand) -> Result<usize, DriverError> {
        reject_procedures(command)?;
        let mut stmt = self.conn.prepare(command.text())?;
        bind_parameters(&mut stmt, command.params())?;
        Ok(stmt.raw_execute()?)
    }

    fn query(&mut self, command: &DbCommand, sink: &mut dyn RowSink) -> Result<(), DriverError> {
        reject_procedures(command)?;
        let mut stmt = self.conn.prepare(command.text())?;
        bind_parameters(&mut stmt, command.params())?;
        stream_rows(&mut stmt, sink)?;
        Ok(())
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), DriverError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), DriverError> {
        self.conn.close().map_err(|(_conn, err)| DriverError::Sqlite(err))
    }
}
