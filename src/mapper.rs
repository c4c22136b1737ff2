//! Row-to-entity mapping.
//!
//! An [`Entity`] exposes a [`TypeDescriptor`] listing its settable fields. For
//! each result set a [`ColumnPlan`] resolves every field to a column once; rows
//! are then mapped by index. Columns without a field are ignored and fields
//! without a column keep their `Default` value.

use std::fmt;

use crate::error::SqlMapperError;
use crate::results::{Columns, DbRow, ResultSet};
use crate::types::RowValues;

mod convert;
mod descriptor;
mod macros;

pub use convert::{ConversionError, FromColumn};
pub use descriptor::{FieldDescriptor, FieldSetter, TypeDescriptor};

/// A type that can be built from a result row.
///
/// Usually implemented with [`impl_entity!`](crate::impl_entity).
pub trait Entity: Default + 'static {
    fn descriptor() -> &'static TypeDescriptor<Self>;
}

struct Slot {
    field: usize,
    column: usize,
}

/// Field-to-column resolution for one entity type against one set of columns.
pub struct ColumnPlan<E: 'static> {
    descriptor: &'static TypeDescriptor<E>,
    column_names: Vec<String>,
    slots: Vec<Slot>,
}

impl<E: Entity> ColumnPlan<E> {
    /// Match each field to the exact column name, or failing that to the first
    /// column equal ignoring ASCII case.
    #[must_use]
    pub fn new(columns: &Columns) -> Self {
        let descriptor = E::descriptor();
        let slots = descriptor
            .fields()
            .iter()
            .enumerate()
            .filter_map(|(field, f)| {
                columns
                    .resolve(f.column())
                    .map(|column| Slot { field, column })
            })
            .collect();
        Self {
            descriptor,
            column_names: columns.names().to_vec(),
            slots,
        }
    }

    /// Number of fields that found a column.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.slots.len()
    }

    /// Build one entity from row values laid out like the planned columns.
    ///
    /// # Errors
    /// Returns `SqlMapperError::TypeMismatch` when a value cannot be stored in
    /// its field.
    pub fn map(&self, values: &[RowValues]) -> Result<E, SqlMapperError> {
        let mut entity = E::default();
        for slot in &self.slots {
            let Some(value) = values.get(slot.column) else {
                continue;
            };
            let field = &self.descriptor.fields()[slot.field];
            field
                .set(&mut entity, value)
                .map_err(|e| SqlMapperError::TypeMismatch {
                    entity: self.descriptor.type_name(),
                    field: field.name(),
                    column: self.column_names[slot.column].clone(),
                    expected: e.expected,
                    found: e.found,
                })?;
        }
        Ok(entity)
    }
}

impl<E: 'static> fmt::Debug for ColumnPlan<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<(&str, &str)> = self
            .slots
            .iter()
            .map(|s| {
                (
                    self.descriptor.fields()[s.field].name(),
                    self.column_names[s.column].as_str(),
                )
            })
            .collect();
        f.debug_struct("ColumnPlan")
            .field("entity", &self.descriptor.type_name())
            .field("fields", &pairs)
            .finish()
    }
}

/// Map every row of a result set, in order.
///
/// # Errors
/// Returns `SqlMapperError::TypeMismatch` for the first value that does not fit.
pub fn map_rows<E: Entity>(result_set: &ResultSet) -> Result<Vec<E>, SqlMapperError> {
    let plan = ColumnPlan::<E>::new(result_set.columns());
    result_set.iter().map(|row| plan.map(row.values())).collect()
}

/// Map a single row.
///
/// # Errors
/// Returns `SqlMapperError::TypeMismatch` when a value does not fit its field.
pub fn map_row<E: Entity>(row: &DbRow) -> Result<E, SqlMapperError> {
    ColumnPlan::<E>::new(row.columns()).map(row.values())
}

/// Map the first row of a result set.
///
/// # Errors
/// Returns `SqlMapperError::EmptyResult` when there are no rows.
pub fn first_entity<E: Entity>(result_set: &ResultSet) -> Result<E, SqlMapperError> {
    let row = result_set.first().ok_or(SqlMapperError::EmptyResult {
        entity: E::descriptor().type_name(),
    })?;
    map_row(row)
}
