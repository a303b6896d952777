use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::value::Value;

/// A single decoded result row with access by column name or position.
///
/// Column names are shared across all rows of one statement. Lookup by name
/// follows column order with a later duplicate name overwriting an earlier
/// one, so `get` on a row with two columns both named `x` returns the second
/// column's value.
#[derive(Debug, Clone)]
pub struct Row {
    /// The column names for this row (shared across all rows of a statement)
    pub columns: Arc<Vec<String>>,
    /// The decoded values, in column order
    pub values: Vec<Value>,
    // Name-to-index cache; built once per row set of columns.
    index: Arc<HashMap<String, usize>>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        // Insertion order makes a later duplicate column win the lookup.
        let index = Arc::new(
            columns
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect::<HashMap<_, _>>(),
        );
        Self {
            columns,
            values,
            index,
        }
    }

    /// Get a value by column name, or None if the row has no such column.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&Value> {
        self.index
            .get(column_name)
            .and_then(|&idx| self.values.get(idx))
    }

    /// Get a value by column position.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The materialized result of one script fragment that produced at least one
/// row: the fragment's column names plus every decoded row in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names declared by the compiled fragment
    pub columns: Vec<String>,
    /// Decoded rows, each in column order
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }
}
