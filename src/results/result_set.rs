use std::sync::Arc;

use super::row::{Columns, DbRow};
use crate::types::RowValues;

/// A fully materialized query result: ordered columns and ordered rows.
///
/// Immutable once handed to the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Arc<Columns>,
    rows: Vec<DbRow>,
}

impl ResultSet {
    /// Create an empty result set for the given columns
    ///
    /// # Arguments
    ///
    /// * `columns` - Column names shared by all rows
    /// * `capacity` - The initial capacity for the result rows
    #[must_use]
    pub fn with_capacity(columns: Arc<Columns>, capacity: usize) -> ResultSet {
        ResultSet {
            columns,
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Build a result set from column names and row values.
    ///
    /// Mostly useful for mapping data that did not come from a driver.
    #[must_use]
    pub fn from_rows<I, S>(column_names: I, rows: Vec<Vec<RowValues>>) -> ResultSet
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns = Arc::new(Columns::new(
            column_names.into_iter().map(Into::into).collect(),
        ));
        let mut result_set = ResultSet::with_capacity(columns, rows.len());
        for values in rows {
            result_set.add_row_values(values);
        }
        result_set
    }

    pub(crate) fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        self.rows.push(DbRow::new(Arc::clone(&self.columns), row_values));
    }

    #[must_use]
    pub fn columns(&self) -> &Arc<Columns> {
        &self.columns
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.columns.names()
    }

    #[must_use]
    pub fn rows(&self) -> &[DbRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&DbRow> {
        self.rows.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DbRow> {
        self.rows.iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a DbRow;
    type IntoIter = std::slice::Iter<'a, DbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = DbRow;
    type IntoIter = std::vec::IntoIter<DbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
