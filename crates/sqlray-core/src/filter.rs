//! Metadata filter
//!
//! Narrows a schema description down to the records that belong to a set of
//! tables, so only relevant context is sent to the model.

use std::collections::HashSet;

use crate::schema::{SchemaDescription, SchemaRecord};

/// Records that belong to the requested tables, in their original order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilteredMetadata {
    pub columns: Vec<SchemaRecord>,
    pub indexes: Vec<SchemaRecord>,
    pub tables: Vec<SchemaRecord>,
    pub views: Vec<SchemaRecord>,
}

impl FilteredMetadata {
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    pub fn record_count(&self) -> usize {
        self.columns.len() + self.indexes.len() + self.tables.len() + self.views.len()
    }
}

/// Order-preserving filter over schema records, keyed on the `table` field.
///
/// Matching is exact and case-sensitive. Records with no string `table`
/// field never match.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    tables: HashSet<String>,
}

impl MetadataFilter {
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, record: &SchemaRecord) -> bool {
        record
            .table()
            .is_some_and(|table| self.tables.contains(table))
    }

    pub fn filter_records(&self, records: &[SchemaRecord]) -> Vec<SchemaRecord> {
        records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect()
    }

    /// Filters all four record sequences of a schema description.
    pub fn filter(&self, description: &SchemaDescription) -> FilteredMetadata {
        let filtered = FilteredMetadata {
            columns: self.filter_records(&description.columns),
            indexes: self.filter_records(&description.indexes),
            tables: self.filter_records(&description.tables),
            views: self.filter_records(&description.views),
        };

        tracing::debug!(
            requested = self.tables.len(),
            columns = filtered.columns.len(),
            indexes = filtered.indexes.len(),
            tables = filtered.tables.len(),
            views = filtered.views.len(),
            "Filtered schema metadata"
        );

        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: serde_json::Value) -> SchemaRecord {
        SchemaRecord::new(value)
    }

    fn sample_records() -> Vec<SchemaRecord> {
        vec![
            record(json!({"table": "orders", "name": "id"})),
            record(json!({"table": "customers", "name": "id"})),
            record(json!({"name": "dangling"})),
            record(json!({"table": "orders", "name": "customer_id"})),
            record(json!({"table": null, "name": "null_table"})),
            record(json!("not an object")),
            record(json!({"table": "line_items", "name": "order_id"})),
        ]
    }

    #[test]
    fn test_filter_preserves_relative_order() {
        let filter = MetadataFilter::new(["line_items", "orders"]);
        let filtered = filter.filter_records(&sample_records());

        let names: Vec<_> = filtered
            .iter()
            .map(|r| r.get("name").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["id", "customer_id", "order_id"]);
    }

    #[test]
    fn test_records_without_table_never_match() {
        let filter = MetadataFilter::new(["orders", "customers", "line_items"]);
        let filtered = filter.filter_records(&sample_records());

        assert_eq!(filtered.len(), 4);
        assert!(filtered.iter().all(|r| r.table().is_some()));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let filter = MetadataFilter::new(["orders"]);
        let once = filter.filter_records(&sample_records());
        let twice = filter.filter_records(&once);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let filter = MetadataFilter::new(["Orders"]);
        assert!(filter.filter_records(&sample_records()).is_empty());
    }

    #[test]
    fn test_empty_table_set_matches_nothing() {
        let filter = MetadataFilter::new(Vec::<String>::new());
        assert!(filter.filter_records(&sample_records()).is_empty());
    }

    #[test]
    fn test_filter_description() {
        let description = SchemaDescription::from_value(&json!({
            "columns": [
                {"table": "orders", "name": "id"},
                {"table": "customers", "name": "email"}
            ],
            "indexes": [{"table": "customers", "name": "customers_email_idx"}],
            "tables": [{"table": "orders", "rows": 1200000}, {"table": "customers"}],
            "views": [],
            "version": "pg14"
        }))
        .unwrap();

        let filtered = MetadataFilter::new(["orders"]).filter(&description);

        assert_eq!(filtered.columns, vec![record(json!({"table": "orders", "name": "id"}))]);
        assert!(filtered.indexes.is_empty());
        assert_eq!(
            filtered.tables,
            vec![record(json!({"table": "orders", "rows": 1200000}))]
        );
        assert!(filtered.views.is_empty());
        assert_eq!(filtered.record_count(), 2);
    }

    #[test]
    fn test_duplicate_requested_tables_do_not_duplicate_records() {
        let filter = MetadataFilter::new(["orders", "orders"]);
        assert_eq!(filter.filter_records(&sample_records()).len(), 2);
    }
}
