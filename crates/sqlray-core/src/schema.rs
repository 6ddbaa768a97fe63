//! Schema store
//!
//! Holds the user-supplied database description (columns, indexes, tables,
//! views and server version). Records are kept as untyped JSON; the only
//! field the optimizer looks at is an optional `table` key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

use crate::error::{OptimizerError, OptimizerResult};

/// Top-level keys a schema description must carry, in validation order.
pub const REQUIRED_SCHEMA_KEYS: &[&str] = &["columns", "indexes", "tables", "views", "version"];

/// A column, index, view or table record from the schema description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaRecord(Value);

impl SchemaRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The table this record belongs to, if it names one.
    pub fn table(&self) -> Option<&str> {
        self.0.get("table").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for SchemaRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// A validated database description.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaDescription {
    pub columns: Vec<SchemaRecord>,
    pub indexes: Vec<SchemaRecord>,
    pub tables: Vec<SchemaRecord>,
    pub views: Vec<SchemaRecord>,
    pub version: String,
}

impl SchemaDescription {
    /// Validates the top-level shape of `raw` and copies its contents.
    ///
    /// Only the presence of the five required keys is checked. Inner records
    /// are taken as-is, and a key whose value is not an array is treated as
    /// an empty sequence.
    pub fn from_value(raw: &Value) -> OptimizerResult<Self> {
        let object = raw
            .as_object()
            .ok_or(OptimizerError::SchemaValidation(REQUIRED_SCHEMA_KEYS[0]))?;

        if let Some(missing) = REQUIRED_SCHEMA_KEYS
            .iter()
            .find(|key| !object.contains_key(**key))
        {
            return Err(OptimizerError::SchemaValidation(*missing));
        }

        let version = match &object["version"] {
            Value::String(version) => version.clone(),
            other => other.to_string(),
        };

        Ok(Self {
            columns: records(&object["columns"]),
            indexes: records(&object["indexes"]),
            tables: records(&object["tables"]),
            views: records(&object["views"]),
            version,
        })
    }

    /// Distinct table names referenced by any record, in first-seen order.
    ///
    /// Table records come first, then columns, indexes and views.
    pub fn table_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.tables
            .iter()
            .chain(&self.columns)
            .chain(&self.indexes)
            .chain(&self.views)
            .filter_map(SchemaRecord::table)
            .filter(|name| seen.insert(*name))
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.columns.len() + self.indexes.len() + self.tables.len() + self.views.len()
    }
}

fn records(value: &Value) -> Vec<SchemaRecord> {
    match value.as_array() {
        Some(items) => items.iter().cloned().map(SchemaRecord::new).collect(),
        None => {
            tracing::debug!(value = %value, "Schema section is not an array, treating as empty");
            Vec::new()
        }
    }
}

/// Owns the schema description for a session.
///
/// A new successful load replaces the previous description wholesale; a
/// failed load leaves it untouched.
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    description: Option<SchemaDescription>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, raw: &Value) -> OptimizerResult<()> {
        let description = SchemaDescription::from_value(raw)?;
        tracing::info!(
            version = %description.version,
            columns = description.columns.len(),
            indexes = description.indexes.len(),
            tables = description.tables.len(),
            views = description.views.len(),
            "Database schema loaded"
        );
        self.description = Some(description);
        Ok(())
    }

    /// Reads a JSON schema file and loads it.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> OptimizerResult<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| OptimizerError::SchemaIo {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: Value =
            serde_json::from_str(&content).map_err(|e| OptimizerError::SchemaParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        self.load(&raw)
    }

    pub fn description(&self) -> Option<&SchemaDescription> {
        self.description.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.description.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn full_schema() -> Value {
        json!({
            "columns": [{"table": "orders", "name": "id"}],
            "indexes": [],
            "tables": [{"table": "orders"}],
            "views": [],
            "version": "pg14"
        })
    }

    #[test]
    fn test_load_valid_schema() {
        let mut store = SchemaStore::new();
        store.load(&full_schema()).unwrap();

        let description = store.description().unwrap();
        assert_eq!(description.version, "pg14");
        assert_eq!(description.columns.len(), 1);
        assert_eq!(description.columns[0].table(), Some("orders"));
        assert_eq!(description.columns[0].get("name"), Some(&json!("id")));
        assert_eq!(description.record_count(), 2);
    }

    #[test]
    fn test_missing_keys_reported_in_fixed_order() {
        for (index, key) in REQUIRED_SCHEMA_KEYS.iter().enumerate() {
            let mut raw = full_schema();
            let object = raw.as_object_mut().unwrap();
            // Remove this key and every key after it; the first one must be reported.
            for later in &REQUIRED_SCHEMA_KEYS[index..] {
                object.remove(*later);
            }

            let err = SchemaDescription::from_value(&raw).unwrap_err();
            assert!(
                matches!(err, OptimizerError::SchemaValidation(k) if k == *key),
                "expected {} to be reported, got {:?}",
                key,
                err
            );
        }
    }

    #[test]
    fn test_empty_object_reports_columns() {
        let err = SchemaDescription::from_value(&json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Database schema must contain columns");
    }

    #[test]
    fn test_non_object_reports_columns() {
        let err = SchemaDescription::from_value(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, OptimizerError::SchemaValidation("columns")));
    }

    #[test]
    fn test_failed_load_keeps_previous_description() {
        let mut store = SchemaStore::new();
        store.load(&full_schema()).unwrap();

        let err = store.load(&json!({"columns": []})).unwrap_err();
        assert!(matches!(err, OptimizerError::SchemaValidation("indexes")));
        assert_eq!(store.description().unwrap().version, "pg14");
    }

    #[test]
    fn test_reload_replaces_description() {
        let mut store = SchemaStore::new();
        store.load(&full_schema()).unwrap();
        store
            .load(&json!({
                "columns": [], "indexes": [], "tables": [], "views": [], "version": "mysql8"
            }))
            .unwrap();

        let description = store.description().unwrap();
        assert_eq!(description.version, "mysql8");
        assert!(description.columns.is_empty());
    }

    #[test]
    fn test_null_sections_behave_as_empty() {
        let raw = json!({
            "columns": null, "indexes": {}, "tables": [], "views": "none", "version": 14
        });
        let description = SchemaDescription::from_value(&raw).unwrap();
        assert!(description.columns.is_empty());
        assert!(description.indexes.is_empty());
        assert!(description.views.is_empty());
        assert_eq!(description.version, "14");
    }

    #[test]
    fn test_records_without_table_are_kept_at_load() {
        let raw = json!({
            "columns": [{"name": "orphan"}, 42, {"table": 7}],
            "indexes": [], "tables": [], "views": [], "version": "pg14"
        });
        let description = SchemaDescription::from_value(&raw).unwrap();
        assert_eq!(description.columns.len(), 3);
        assert!(description.columns.iter().all(|c| c.table().is_none()));
    }

    #[test]
    fn test_table_names_first_seen_order() {
        let raw = json!({
            "columns": [
                {"table": "orders", "name": "id"},
                {"table": "customers", "name": "id"},
                {"table": "orders", "name": "total"}
            ],
            "indexes": [{"table": "line_items", "name": "idx"}],
            "tables": [{"table": "customers"}],
            "views": [{"name": "no_table"}],
            "version": "pg14"
        });
        let description = SchemaDescription::from_value(&raw).unwrap();
        assert_eq!(
            description.table_names(),
            vec!["customers", "orders", "line_items"]
        );
    }

    #[test]
    fn test_load_is_a_copy() {
        let mut raw = full_schema();
        let mut store = SchemaStore::new();
        store.load(&raw).unwrap();

        raw["version"] = json!("changed");
        assert_eq!(store.description().unwrap().version, "pg14");
    }
}
