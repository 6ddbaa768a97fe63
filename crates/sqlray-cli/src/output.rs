//! Terminal rendering of optimization results

use anyhow::Result;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use sqlray_core::{OptimizationRequest, OptimizationResult};

pub fn format_score(score: Option<f64>) -> String {
    match score {
        Some(score) => format!("{:.2}", score),
        None => "n/a".to_string(),
    }
}

fn summary_table(result: &OptimizationResult) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Metric", "Value"])
        .add_row(vec![
            "Optimization score".to_string(),
            format_score(result.optimization_score),
        ])
        .add_row(vec![
            "Prepare statements".to_string(),
            result.prepare_query.len().to_string(),
        ])
        .add_row(vec![
            "Schema changes".to_string(),
            if result.has_schema_changes() { "yes" } else { "no" }.to_string(),
        ]);
    table
}

/// Labelled sections followed by a score summary.
pub fn format_result(result: &OptimizationResult) -> String {
    let mut out = String::new();

    out.push_str("Prepare statements:\n");
    if result.prepare_query.is_empty() {
        out.push_str("  (none)\n");
    }
    for statement in &result.prepare_query {
        out.push_str(statement.trim());
        out.push('\n');
    }

    out.push_str("\nOptimized query:\n");
    out.push_str(result.query.trim());
    out.push('\n');

    out.push_str("\nExplanation:\n");
    out.push_str(result.explanation.trim());
    out.push_str("\n\n");

    out.push_str(&summary_table(result).to_string());
    out.push('\n');
    out
}

pub fn print_result(result: &OptimizationResult) {
    print!("{}", format_result(result));
}

pub fn print_json(result: &OptimizationResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

/// Extracted tables and the prompt that would be sent for optimization.
pub fn format_dry_run(request: &OptimizationRequest) -> String {
    let tables = if request.tables.is_empty() {
        "(none)".to_string()
    } else {
        request.tables.join(", ")
    };
    format!(
        "Tables: {}\nSchema records: {}\n\nPrompt:\n{}\n",
        tables,
        request.metadata.record_count(),
        request.prompt()
    )
}

pub fn format_table_list(tables: &[&str]) -> String {
    if tables.is_empty() {
        return "No tables in the loaded schema.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Table"]);
    for name in tables {
        table.add_row(vec![*name]);
    }
    table.to_string()
}
