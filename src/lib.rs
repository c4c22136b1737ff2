//! Synchronous, provider-agnostic command execution and entity mapping.
//!
//! A [`CommandExecutor`] is bound to one connection string and one
//! [`Dialect`]. Each call opens a native connection through the dialect's
//! provider, runs one command and closes the connection again. Rows come back
//! as a [`ResultSet`], a streaming [`RowCursor`], a scalar, or as typed
//! entities mapped by column name.
//!
//! ```rust,no_run
//! use sql_mapper::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Student {
//!     name: String,
//!     age: i64,
//! }
//!
//! impl_entity!(Student { name, age });
//!
//! # fn demo() -> Result<(), SqlMapperError> {
//! let db = CommandExecutor::new("school.db", Dialect::Sqlite)?;
//! let params = [db.make_input("min_age", 18)];
//! let adults: Vec<Student> = db.query_for_entities(
//!     "select Name, Age from Student where Age >= :min_age",
//!     &params,
//!     CommandKind::Text,
//! )?;
//! # let _ = adults;
//! # Ok(()) }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod mapper;
pub mod params;
pub mod prelude;
pub mod provider;
pub mod results;
pub mod translation;
pub mod types;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::{CommandExecutorBuilder, ExecutorOptions};
pub use error::{DriverError, SqlMapperError};
pub use executor::{CommandExecutor, EntityIter, RowCursor};
pub use mapper::{ColumnPlan, Entity, FromColumn, TypeDescriptor};
pub use params::Parameter;
pub use provider::{DbCommand, DbConnection, ProviderFactory, RowSink};
pub use results::{Columns, DbRow, ResultSet};
pub use types::{CommandKind, Dialect, Direction, RowValues};
