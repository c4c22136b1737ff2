//! Convenient imports for common functionality.
//!
//! ```rust
//! use sql_mapper::prelude::*;
//! ```

pub use crate::config::{CommandExecutorBuilder, ExecutorOptions};
pub use crate::error::{DriverError, SqlMapperError};
pub use crate::executor::{CommandExecutor, EntityIter, RowCursor};
pub use crate::impl_entity;
pub use crate::mapper::{Entity, FromColumn};
pub use crate::params::Parameter;
pub use crate::results::{DbRow, ResultSet};
pub use crate::types::{CommandKind, Dialect, Direction, RowValues};
