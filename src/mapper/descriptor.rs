use std::fmt;

use super::convert::ConversionError;
use crate::types::RowValues;

/// Stores one column value into one field of `E`.
pub type FieldSetter<E> = fn(&mut E, &RowValues) -> Result<(), ConversionError>;

/// A settable field of an entity and the column it reads from.
pub struct FieldDescriptor<E> {
    name: &'static str,
    column: &'static str,
    setter: FieldSetter<E>,
}

impl<E> FieldDescriptor<E> {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Column name this field is matched against.
    #[must_use]
    pub fn column(&self) -> &'static str {
        self.column
    }

    pub(crate) fn set(&self, entity: &mut E, value: &RowValues) -> Result<(), ConversionError> {
        (self.setter)(entity, value)
    }
}

impl<E> fmt::Debug for FieldDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

/// Per-type mapping metadata: the settable fields of `E` in declaration order.
///
/// Built once per type, normally by [`impl_entity!`](crate::impl_entity), and
/// read concurrently afterwards.
pub struct TypeDescriptor<E> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor<E>>,
}

impl<E> TypeDescriptor<E> {
    /// An empty descriptor named after the type's last path segment.
    #[must_use]
    pub fn new() -> Self {
        let full = std::any::type_name::<E>();
        let base = full.split('<').next().unwrap_or(full);
        let type_name = base.rsplit("::").next().unwrap_or(base);
        Self {
            type_name,
            fields: Vec::new(),
        }
    }

    /// Add a field matched against a column of the same name.
    #[must_use]
    pub fn field(self, name: &'static str, setter: FieldSetter<E>) -> Self {
        self.mapped_field(name, None, setter)
    }

    /// Add a field, optionally matched against a differently named column.
    #[must_use]
    pub fn mapped_field(
        mut self,
        name: &'static str,
        column: Option<&'static str>,
        setter: FieldSetter<E>,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name,
            column: column.unwrap_or(name),
            setter,
        });
        self
    }

    /// Point an already declared field at another column. Unknown field names
    /// are ignored.
    #[must_use]
    pub fn column_override(mut self, field: &str, column: &'static str) -> Self {
        if let Some(descriptor) = self.fields.iter_mut().find(|f| f.name == field) {
            descriptor.column = column;
        }
        self
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor<E>] {
        &self.fields
    }
}

impl<E> Default for TypeDescriptor<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for TypeDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}
