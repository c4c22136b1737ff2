use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// Column names of a result, shared by every row produced from it.
#[derive(Debug, Default, PartialEq)]
pub struct Columns {
    names: Vec<String>,
    // Exact-name lookup; case-insensitive lookups fall back to a scan.
    index: HashMap<String, usize>,
}

impl Columns {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            // Duplicate names keep their first position.
            index.entry(name.clone()).or_insert(i);
        }
        Self { names, index }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Exact, case-sensitive position of a column.
    #[must_use]
    pub fn position(&self, column_name: &str) -> Option<usize> {
        self.index.get(column_name).copied()
    }

    /// Position of a column: an exact match first, otherwise the first column
    /// whose name matches ignoring ASCII case.
    #[must_use]
    pub fn resolve(&self, column_name: &str) -> Option<usize> {
        self.position(column_name).or_else(|| {
            self.names
                .iter()
                .position(|name| name.eq_ignore_ascii_case(column_name))
        })
    }
}

/// A row from a database query result
///
/// This struct represents a single row from a database query result,
/// with access to both the column names and the values.
#[derive(Debug, Clone, PartialEq)]
pub struct DbRow {
    columns: Arc<Columns>,
    values: Vec<RowValues>,
}

impl DbRow {
    /// Create a new database row
    ///
    /// # Arguments
    ///
    /// * `columns` - The column names, shared with sibling rows
    /// * `values` - The values for this row, in column order
    #[must_use]
    pub fn new(columns: Arc<Columns>, values: Vec<RowValues>) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn columns(&self) -> &Arc<Columns> {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        self.values
    }

    /// Get a value from the row by column name (exact, then ignoring ASCII case)
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.columns
            .resolve(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Arc<Columns> {
        Arc::new(Columns::new(vec![
            "Name".to_string(),
            "sex".to_string(),
            "name".to_string(),
        ]))
    }

    #[test]
    fn exact_match_wins_over_case_folding() {
        let cols = columns();
        assert_eq!(cols.resolve("name"), Some(2));
        assert_eq!(cols.resolve("Name"), Some(0));
        assert_eq!(cols.resolve("NAME"), Some(0));
        assert_eq!(cols.resolve("SEX"), Some(1));
        assert_eq!(cols.resolve("age"), None);
    }

    #[test]
    fn row_lookup_by_name_and_index() {
        let row = DbRow::new(
            columns(),
            vec![
                RowValues::Text("Ann".into()),
                RowValues::Text("F".into()),
                RowValues::Null,
            ],
        );
        assert_eq!(row.get("Sex"), Some(&RowValues::Text("F".into())));
        assert_eq!(row.get_by_index(2), Some(&RowValues::Null));
        assert_eq!(row.get("missing"), None);
    }
}
