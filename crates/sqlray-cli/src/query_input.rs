//! Reading queries from flags, files and an external editor

use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::Path;
use std::process::Command;

const FALLBACK_EDITOR: &str = "vi";

/// Returns the query for the `optimize` command. `--query` wins over
/// `--query-file`.
pub fn read_query(query: Option<&str>, query_file: Option<&Path>) -> Result<String> {
    if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
        return Ok(query.to_string());
    }

    match query_file {
        Some(path) => read_query_file(path),
        None => bail!("No query given: pass --query or --query-file"),
    }
}

pub fn read_query_file(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read query file {:?}", path))?;
    let query = content.trim();
    if query.is_empty() {
        bail!("Query file {:?} is empty", path);
    }
    Ok(query.to_string())
}

/// Treats `input` as a path when it names an existing file, otherwise as SQL.
pub fn resolve_input(input: &str) -> Result<String> {
    let input = input.trim();
    let path = Path::new(input);
    if path.is_file() {
        tracing::debug!(path = %path.display(), "Reading query from file");
        return read_query_file(path);
    }
    Ok(input.to_string())
}

/// Editor command from `$VISUAL`, then `$EDITOR`, then `vi`, split into
/// program and arguments.
pub fn editor_command_with<F>(env: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let command = ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|name| env(name))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_EDITOR.to_string());

    command.split_whitespace().map(str::to_string).collect()
}

/// Opens the user's editor on a temporary `.sql` file and returns what was saved.
pub fn edit_query(initial: &str) -> Result<String> {
    let mut buffer = tempfile::Builder::new()
        .prefix("sqlray-")
        .suffix(".sql")
        .tempfile()
        .context("Failed to create temporary query file")?;
    buffer.write_all(initial.as_bytes())?;
    buffer.flush()?;

    let command = editor_command_with(|name| std::env::var(name).ok());
    let Some((program, args)) = command.split_first() else {
        bail!("No editor configured");
    };

    let status = Command::new(program)
        .args(args)
        .arg(buffer.path())
        .status()
        .with_context(|| format!("Failed to launch editor '{}'", program))?;
    if !status.success() {
        bail!("Editor '{}' exited with {}", program, status);
    }

    let content = std::fs::read_to_string(buffer.path())
        .context("Failed to read back the edited query")?;
    Ok(content.trim().to_string())
}
