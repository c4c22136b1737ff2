use std::ops::ControlFlow;
use std::sync::Arc;

use crate::provider::RowSink;
use crate::results::{Columns, ResultSet};
use crate::types::RowValues;

/// Collects every row into a [`ResultSet`].
#[derive(Debug, Default)]
pub(super) struct TableSink {
    result: Option<ResultSet>,
}

impl TableSink {
    pub(super) fn into_result_set(self) -> ResultSet {
        self.result.unwrap_or_default()
    }
}

impl RowSink for TableSink {
    fn columns(&mut self, columns: Arc<Columns>) -> ControlFlow<()> {
        self.result = Some(ResultSet::with_capacity(columns, 10));
        ControlFlow::Continue(())
    }

    fn row(&mut self, values: Vec<RowValues>) -> ControlFlow<()> {
        let result = self.result.get_or_insert_with(ResultSet::default);
        result.add_row_values(values);
        ControlFlow::Continue(())
    }
}

/// Keeps the first cell of the first row and stops the driver right after.
#[derive(Debug, Default)]
pub(super) struct ScalarSink {
    value: Option<RowValues>,
}

impl ScalarSink {
    pub(super) fn into_value(self) -> Option<RowValues> {
        self.value
    }
}

impl RowSink for ScalarSink {
    // Statements without result columns still have to run.
    fn columns(&mut self, _columns: Arc<Columns>) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn row(&mut self, values: Vec<RowValues>) -> ControlFlow<()> {
        self.value = Some(values.into_iter().next().unwrap_or(RowValues::Null));
        ControlFlow::Break(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Arc<Columns> {
        Arc::new(Columns::new(names.iter().map(ToString::to_string).collect()))
    }

    #[test]
    fn table_sink_keeps_every_row() {
        let mut sink = TableSink::default();
        assert!(sink.columns(columns(&["a", "b"])).is_continue());
        assert!(sink.row(vec![RowValues::Int(1), RowValues::Null]).is_continue());
        assert!(sink.row(vec![RowValues::Int(2), RowValues::Null]).is_continue());
        let result = sink.into_result_set();
        assert_eq!(result.column_names(), ["a", "b"]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.rows()[1].get("a"), Some(&RowValues::Int(2)));
    }

    #[test]
    fn table_sink_without_columns_is_empty() {
        let result = TableSink::default().into_result_set();
        assert!(result.is_empty());
        assert!(result.column_names().is_empty());
    }

    #[test]
    fn scalar_sink_stops_after_first_row() {
        let mut sink = ScalarSink::default();
        assert!(sink.columns(columns(&["n"])).is_continue());
        assert!(sink.row(vec![RowValues::Int(7), RowValues::Int(8)]).is_break());
        assert_eq!(sink.into_value(), Some(RowValues::Int(7)));
    }

    #[test]
    fn scalar_sink_lets_column_less_statements_run() {
        let mut sink = ScalarSink::default();
        assert!(sink.columns(columns(&[])).is_continue());
        assert_eq!(sink.into_value(), None);
    }

    #[test]
    fn scalar_sink_distinguishes_null_from_no_rows() {
        let mut sink = ScalarSink::default();
        let _ = sink.columns(columns(&["n"]));
        let _ = sink.row(vec![RowValues::Null]);
        assert_eq!(sink.into_value(), Some(RowValues::Null));
        assert_eq!(ScalarSink::default().into_value(), None);
    }
}
