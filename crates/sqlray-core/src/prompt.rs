//! Prompt templates sent to the model

use serde_json::{Value, json};

use crate::optimizer::OptimizationRequest;
use crate::schema::SchemaRecord;

/// Asks the model which tables a query reads or writes.
pub fn table_extraction_prompt(query: &str) -> String {
    format!(
        r#"The following SQL query runs against a relational database. List every table it references, including tables used in joins, subqueries and common table expressions. Do not list CTE names or aliases as tables. Answer only with JSON in this format:
{{
    "tables": ["table1", "table2"]
}}
---
SQL query:
{query}
---"#,
        query = query.trim()
    )
}

/// Asks the model to rewrite a query using the filtered schema context.
pub fn optimization_prompt(request: &OptimizationRequest) -> String {
    let metadata = &request.metadata;
    format!(
        r#"Objective: optimize the given SQL query for better performance.
Instructions:
1. Examine the provided SQL query together with its tables, columns, indexes and views.
2. Identify inefficiencies in the query and in the schema design.
3. Propose optimizations, which may include rewriting the query or adding and changing indexes.
4. Keep every part of the original query. The rewritten query must return exactly the same result, must be complete and must run as-is. Never abbreviate or omit clauses.
5. Put index creation and any other preparation statements in "prepare_query", separate from the rewritten query. If indexes alone are enough, return the original query unchanged in "query".
6. Answer only with a JSON object in this format:
{{
    "prepare_query": ["CREATE INDEX ...", "..."],
    "query": "SELECT ...",
    "optimization_score": 0.5,
    "explanation": "..."
}}
"optimization_score" is a number between 0 and 1, where 0 means no improvement and 1 means a perfect optimization.
"explanation" describes the changes and the differences from the original query in plain English, for someone with a basic understanding of SQL.
Provided information:
---
Server: {version}
---
Tables:
{tables}
---
Columns:
{columns}
---
Indexes:
{indexes}
---
Views:
{views}
---
SQL query:
{query}
---"#,
        version = request.server_version,
        tables = render_records(&metadata.tables),
        columns = render_records(&metadata.columns),
        indexes = render_records(&metadata.indexes),
        views = render_records(&metadata.views),
        query = request.query,
    )
}

/// JSON Schema of the optimization answer, for providers with structured output.
pub fn optimization_response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "prepare_query": {
                "type": "array",
                "items": {"type": "string"}
            },
            "query": {"type": "string"},
            "optimization_score": {"type": "number"},
            "explanation": {"type": "string"}
        },
        "required": ["prepare_query", "query", "optimization_score", "explanation"],
        "additionalProperties": false
    })
}

fn render_records(records: &[SchemaRecord]) -> String {
    Value::Array(records.iter().map(|r| r.as_value().clone()).collect()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilteredMetadata;
    use serde_json::json;

    #[test]
    fn test_extraction_prompt_embeds_query() {
        let prompt = table_extraction_prompt("  SELECT * FROM orders o JOIN users u ON u.id = o.user_id\n");
        assert!(prompt.contains("SELECT * FROM orders o JOIN users u ON u.id = o.user_id\n---"));
        assert!(prompt.contains(r#""tables": ["table1", "table2"]"#));
    }

    #[test]
    fn test_optimization_prompt_sections() {
        let request = OptimizationRequest {
            query: "SELECT * FROM orders WHERE status = 'open'".to_string(),
            tables: vec!["orders".to_string()],
            metadata: FilteredMetadata {
                columns: vec![SchemaRecord::new(json!({"table": "orders", "name": "status"}))],
                indexes: vec![],
                tables: vec![SchemaRecord::new(json!({"table": "orders"}))],
                views: vec![],
            },
            server_version: "PostgreSQL 14.2".to_string(),
        };

        let prompt = optimization_prompt(&request);
        assert!(prompt.contains("Server: PostgreSQL 14.2"));
        assert!(prompt.contains(r#"Columns:
[{"name":"status","table":"orders"}]"#));
        assert!(prompt.contains("Indexes:\n[]"));
        assert!(prompt.ends_with("SELECT * FROM orders WHERE status = 'open'\n---"));
    }

    #[test]
    fn test_response_schema_requires_all_fields() {
        let schema = optimization_response_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 4);
        assert_eq!(schema["additionalProperties"], json!(false));
    }
}
