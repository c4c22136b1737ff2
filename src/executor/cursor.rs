use std::fmt;
use std::ops::ControlFlow;
use std::panic;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::settle;
use crate::config::ExecutorOptions;
use crate::error::{DriverError, SqlMapperError};
use crate::mapper::{ColumnPlan, Entity};
use crate::provider::{DbCommand, ProviderFactory, RowSink};
use crate::results::{Columns, DbRow};
use crate::types::{Dialect, RowValues};

/// Rows buffered between the worker and the consumer.
const READ_AHEAD: usize = 64;

enum CursorMessage {
    Columns(Arc<Columns>),
    Row(Vec<RowValues>),
}

/// Forwards driver output to the cursor. A closed channel means the cursor
/// went away, so the driver is told to stop.
struct ChannelSink {
    sender: SyncSender<CursorMessage>,
}

impl RowSink for ChannelSink {
    fn columns(&mut self, columns: Arc<Columns>) -> ControlFlow<()> {
        match self.sender.send(CursorMessage::Columns(columns)) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }

    fn row(&mut self, values: Vec<RowValues>) -> ControlFlow<()> {
        match self.sender.send(CursorMessage::Row(values)) {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        }
    }
}

/// Forward-only cursor returned by
/// [`CommandExecutor::execute_reader`](crate::CommandExecutor::execute_reader).
///
/// A dedicated thread owns the connection for the cursor's lifetime and feeds
/// rows through a bounded channel. The connection is closed once the rows run
/// out, [`close`](Self::close) is called, or the cursor is dropped; dropping it
/// early stops the query.
pub struct RowCursor {
    dialect: Dialect,
    columns: Arc<Columns>,
    receiver: Option<Receiver<CursorMessage>>,
    worker: Option<JoinHandle<Result<(), SqlMapperError>>>,
    pending: Option<Vec<RowValues>>,
}

impl fmt::Debug for RowCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowCursor")
            .field("dialect", &self.dialect)
            .field("columns", &self.columns.names())
            .field("open", &self.receiver.is_some())
            .finish()
    }
}

impl RowCursor {
    pub(super) fn open(
        provider: Arc<dyn ProviderFactory>,
        connection_string: String,
        options: ExecutorOptions,
        command: DbCommand,
    ) -> Result<Self, SqlMapperError> {
        let dialect = provider.dialect();
        let (sender, receiver) = mpsc::sync_channel(READ_AHEAD);
        let worker = thread::Builder::new()
            .name(format!("sql-mapper-cursor-{dialect}"))
            .spawn(move || {
                let mut conn = provider
                    .open_detached(&connection_string, &options)
                    .map_err(|e| SqlMapperError::driver(dialect, e))?;
                let mut sink = ChannelSink { sender };
                let outcome = conn.query(&command, &mut sink);
                drop(sink);
                let closed = conn.close();
                settle(dialect, outcome, closed)
            })
            .map_err(|e| SqlMapperError::driver(dialect, DriverError::Io(e)))?;

        let mut cursor = RowCursor {
            dialect,
            columns: Arc::new(Columns::default()),
            receiver: Some(receiver),
            worker: Some(worker),
            pending: None,
        };
        // Surface connection and prepare failures here rather than on the first row.
        match cursor.recv() {
            Some(CursorMessage::Columns(columns)) => cursor.columns = columns,
            Some(CursorMessage::Row(values)) => cursor.pending = Some(values),
            None => cursor.finish()?,
        }
        Ok(cursor)
    }

    /// Column names of the result, in order.
    #[must_use]
    pub fn columns(&self) -> &Arc<Columns> {
        &self.columns
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Stop reading and release the connection, reporting any failure the
    /// worker hit while closing it.
    ///
    /// # Errors
    /// Returns `SqlMapperError::Driver` when the query or the close failed.
    pub fn close(mut self) -> Result<(), SqlMapperError> {
        self.receiver = None;
        self.finish()
    }

    /// Map each remaining row onto `E`, resolving columns to fields once.
    #[must_use]
    pub fn entities<E: Entity>(self) -> EntityIter<E> {
        let plan = ColumnPlan::new(&self.columns);
        EntityIter { cursor: self, plan }
    }

    fn recv(&mut self) -> Option<CursorMessage> {
        let message = self.receiver.as_ref()?.recv().ok();
        if message.is_none() {
            self.receiver = None;
        }
        message
    }

    /// Join the worker. Only the first call observes its result.
    fn finish(&mut self) -> Result<(), SqlMapperError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        match worker.join() {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

impl Iterator for RowCursor {
    type Item = Result<DbRow, SqlMapperError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(values) = self.pending.take() {
            return Some(Ok(DbRow::new(Arc::clone(&self.columns), values)));
        }
        loop {
            match self.recv() {
                Some(CursorMessage::Row(values)) => {
                    return Some(Ok(DbRow::new(Arc::clone(&self.columns), values)));
                }
                Some(CursorMessage::Columns(_)) => {}
                None => {
                    debug!(dialect = %self.dialect, "cursor exhausted");
                    return self.finish().err().map(Err);
                }
            }
        }
    }
}

impl Drop for RowCursor {
    fn drop(&mut self) {
        self.receiver = None;
        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(dialect = %self.dialect, error = %err, "cursor dropped with a failed query");
                }
                Err(_) => warn!(dialect = %self.dialect, "cursor worker panicked"),
            }
        }
    }
}

/// Entities mapped from a [`RowCursor`]; see [`RowCursor::entities`].
pub struct EntityIter<E: Entity> {
    cursor: RowCursor,
    plan: ColumnPlan<E>,
}

impl<E: Entity> fmt::Debug for EntityIter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityIter")
            .field("entity", &E::descriptor().type_name())
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl<E: Entity> EntityIter<E> {
    /// Release the underlying cursor.
    ///
    /// # Errors
    /// See [`RowCursor::close`].
    pub fn close(self) -> Result<(), SqlMapperError> {
        self.cursor.close()
    }
}

impl<E: Entity> Iterator for EntityIter<E> {
    type Item = Result<E, SqlMapperError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.cursor.next()?;
        Some(row.and_then(|row| self.plan.map(row.values())))
    }
}
