use serde_json::Value;
use std::collections::BTreeMap;

use crate::types::Identity;

/// A row of a store table as an ordered column to value map.
///
/// Source rows and encoded feed rows share this representation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    columns: BTreeMap<String, Value>,
}

impl TableRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a column value.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.columns.iter()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &String> {
        self.columns.keys()
    }

    /// Reads `column` as an identity, accepting integers and numeric strings.
    pub fn identity(&self, column: &str) -> Option<Identity> {
        match self.columns.get(column)? {
            Value::Number(number) => number.as_i64().map(Identity),
            Value::String(text) => text.trim().parse().ok().map(Identity),
            _ => None,
        }
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.columns.get(column).and_then(Value::as_str)
    }

    /// Reads `column` as a flag; a missing or null column reads as `false`.
    pub fn flag(&self, column: &str) -> bool {
        match self.columns.get(column) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_i64().is_some_and(|n| n != 0),
            _ => false,
        }
    }
}

impl FromIterator<(String, Value)> for TableRow {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}
