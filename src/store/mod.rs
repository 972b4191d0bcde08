pub mod seed;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::{error::Error, schema::TableName};

/// One record: field name to JSON scalar, array or null.
pub type Row = serde_json::Map<String, Value>;

pub fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

/// Ordered rows of one resource, unique by `id`.
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.rows.iter().any(|r| row_id(r) == Some(id))
    }

    /// Appends `row`; rejects a missing or duplicate `id`.
    pub fn push(&mut self, row: Row) -> Result<(), Error> {
        let id = row_id(&row)
            .ok_or_else(|| Error::InvalidPayload("row has no string id".to_string()))?;
        if self.contains_id(id) {
            return Err(Error::Conflict(format!("duplicate id {}", id)));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Row> {
        self.rows.iter_mut()
    }

    /// Removes every row matching `pred`, returning them in table order.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&Row) -> bool) -> Vec<Row> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.rows.len());
        for row in self.rows.drain(..) {
            if pred(&row) {
                removed.push(row);
            } else {
                kept.push(row);
            }
        }
        self.rows = kept;
        removed
    }
}

pub(crate) type Tables = HashMap<String, Table>;

/// Owner of every table. Built once, handed to the engine, dropped with it.
#[derive(Debug)]
pub struct TableStore {
    tables: Mutex<Tables>,
}

impl Default for TableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TableStore {
    /// The hosted tables, all empty.
    pub fn new() -> Self {
        let tables = TableName::ALL
            .iter()
            .map(|t| (t.as_str().to_string(), Table::new()))
            .collect();
        Self {
            tables: Mutex::new(tables),
        }
    }

    /// The hosted tables loaded with the marketplace fixtures.
    pub fn seeded() -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.lock().unwrap_or_else(|p| p.into_inner());
            for (name, rows) in seed::fixtures() {
                tables.insert(
                    name.as_str().to_string(),
                    Table {
                        rows: rows.clone(),
                    },
                );
            }
        }
        store
    }

    /// Adds an empty table under `name` unless one exists.
    pub fn create_table(&self, name: &str) -> Result<(), Error> {
        self.lock()?.entry(name.to_string()).or_default();
        Ok(())
    }

    pub fn table_names(&self) -> Result<Vec<String>, Error> {
        let mut names: Vec<String> = self.lock()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Copy of a table's rows in insertion order; empty for unknown tables.
    pub fn snapshot(&self, table: &str) -> Result<Vec<Row>, Error> {
        Ok(self
            .lock()?
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default())
    }

    pub fn len(&self, table: &str) -> Result<usize, Error> {
        Ok(self.lock()?.get(table).map(Table::len).unwrap_or(0))
    }

    /// Drops every row of every table, keeping the tables themselves.
    pub fn clear(&self) -> Result<(), Error> {
        for table in self.lock()?.values_mut() {
            table.rows.clear();
        }
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Tables>, Error> {
        self.tables.lock().map_err(|_| Error::Poisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_push_rejects_duplicate_id() {
        let mut table = Table::new();
        table.push(row(json!({ "id": "a" }))).unwrap();
        let err = table.push(row(json!({ "id": "a" }))).unwrap_err();
        assert_eq!(err.code(), "conflict");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_push_requires_string_id() {
        let mut table = Table::new();
        assert!(table.push(row(json!({ "id": 7 }))).is_err());
        assert!(table.push(row(json!({ "title": "x" }))).is_err());
    }

    #[test]
    fn test_remove_where_keeps_order() {
        let mut table = Table::new();
        for id in ["a", "b", "c", "d"] {
            table.push(row(json!({ "id": id, "odd": id == "a" || id == "c" }))).unwrap();
        }
        let removed = table.remove_where(|r| r["odd"] == json!(true));
        assert_eq!(removed.len(), 2);
        let ids: Vec<_> = table.rows().iter().filter_map(row_id).collect();
        assert_eq!(ids, vec!["b", "d"]);
    }

    #[test]
    fn test_seeded_store_has_fixtures() {
        let store = TableStore::seeded();
        assert_eq!(store.len("cars").unwrap(), 6);
        assert_eq!(store.len("profiles").unwrap(), 2);
        assert_eq!(store.len("garages").unwrap(), 0);
        assert!(store.snapshot("garages").unwrap().is_empty());
    }

    #[test]
    fn test_clear_keeps_tables() {
        let store = TableStore::seeded();
        store.clear().unwrap();
        assert_eq!(store.len("cars").unwrap(), 0);
        assert_eq!(store.table_names().unwrap().len(), 5);
    }
}
