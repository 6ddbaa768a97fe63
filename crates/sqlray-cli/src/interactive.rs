//! Interactive optimization session
//!
//! Set-up prompts for whatever the flags and environment did not provide,
//! then reads one query per line until `exit`.

use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use sqlray_ai::AiProvider;
use sqlray_core::QueryOptimizer;
use sqlray_settings::SqlRaySettings;
use std::path::{Path, PathBuf};

use crate::output;
use crate::query_input;
use crate::session::ProviderArgs;

const DEFAULT_INTERACTIVE_MODEL: &str = "gpt-4o";
const PROMPT: &str = "sqlray> ";

/// What a line typed at the prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Exit,
    /// Compose the query in an external editor
    Edit,
    Tables,
    Empty,
    /// A file path or literal SQL
    Input(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            Self::Empty
        } else if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            Self::Exit
        } else if line == "\\e" {
            Self::Edit
        } else if line.eq_ignore_ascii_case("tables") {
            Self::Tables
        } else {
            Self::Input(line.to_string())
        }
    }
}

/// Model suggested at the set-up prompt.
pub fn default_model(provider: AiProvider) -> &'static str {
    match provider {
        AiProvider::OpenAi => DEFAULT_INTERACTIVE_MODEL,
        other => other.default_model(),
    }
}

/// Returns `None` when the user ends input during set-up.
fn read_line(editor: &mut DefaultEditor, prompt: &str) -> Result<Option<String>> {
    match editor.readline(prompt) {
        Ok(line) => Ok(Some(line.trim().to_string())),
        Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
        Err(err) => Err(err).context("Failed to read input"),
    }
}

pub async fn run(
    provider_args: ProviderArgs,
    schema: Option<PathBuf>,
    settings: SqlRaySettings,
) -> Result<()> {
    if let Err(err) = sqlray_settings::ensure_directories() {
        tracing::warn!(error = %format!("{:#}", err), "Could not create SQLRay directories");
    }

    let mut editor = DefaultEditor::new().context("Failed to initialize line editor")?;
    let history = sqlray_settings::history_file().ok();
    if let Some(path) = &history {
        if editor.load_history(path).is_err() {
            tracing::debug!(path = %path.display(), "No line history yet");
        }
    }

    let Some(optimizer) = set_up(&mut editor, provider_args, schema, &settings)? else {
        return Ok(());
    };

    println!("Enter a query, a path to a .sql file, \\e to open your editor, 'tables' or 'exit'.");

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err).context("Failed to read input"),
        };

        let command = ReplCommand::parse(&line);
        if command != ReplCommand::Empty {
            if let Err(err) = editor.add_history_entry(line.trim()) {
                tracing::debug!(error = %err, "Could not record history entry");
            }
        }

        let query = match command {
            ReplCommand::Exit => break,
            ReplCommand::Empty => continue,
            ReplCommand::Tables => {
                let names = optimizer
                    .schema()
                    .description()
                    .map(|d| d.table_names())
                    .unwrap_or_default();
                println!("{}", output::format_table_list(&names));
                continue;
            }
            ReplCommand::Edit => query_input::edit_query(""),
            ReplCommand::Input(text) => query_input::resolve_input(&text),
        };

        match query {
            Ok(query) if query.is_empty() => println!("Empty query, nothing to do."),
            Ok(query) => optimize_one(&optimizer, &query).await,
            Err(err) => eprintln!("Error: {:#}", err),
        }
    }

    if let Some(path) = &history {
        if let Err(err) = save_history(&mut editor, path) {
            tracing::warn!(path = %path.display(), error = %format!("{:#}", err), "Failed to save line history");
        }
    }
    Ok(())
}

/// Writes the line history, creating its directory first.
fn save_history(editor: &mut DefaultEditor, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    editor
        .save_history(path)
        .with_context(|| format!("Failed to write {:?}", path))
}

async fn optimize_one(optimizer: &QueryOptimizer, query: &str) {
    match optimizer.optimize(query).await {
        Ok(result) => {
            println!();
            output::print_result(&result);
        }
        Err(err) => eprintln!("Error: {}", err),
    }
}

fn set_up(
    editor: &mut DefaultEditor,
    mut provider_args: ProviderArgs,
    schema: Option<PathBuf>,
    settings: &SqlRaySettings,
) -> Result<Option<QueryOptimizer>> {
    let provider = provider_args.provider.unwrap_or(settings.provider);

    if provider_args.model.is_none() {
        let suggested = default_model(provider);
        let Some(model) = read_line(editor, &format!("Model [{}]: ", suggested))? else {
            return Ok(None);
        };
        provider_args.model = Some(if model.is_empty() {
            suggested.to_string()
        } else {
            model
        });
    }

    let mut config = provider_args.resolve(settings);
    if config.api_key.is_none() && config.provider.requires_api_key() {
        let Some(key) = read_line(editor, &format!("{} API key: ", config.provider))? else {
            return Ok(None);
        };
        config.api_key = Some(key).filter(|k| !k.is_empty());
    }

    let mut optimizer = config.build_optimizer()?;
    if provider_args.save_settings {
        config.save_settings(settings)?;
    }

    let mut schema_path = schema.filter(|p| p.is_file());
    loop {
        let path = match schema_path.take() {
            Some(path) => path,
            None => match read_line(editor, "Schema file: ")? {
                Some(path) if path.is_empty() => continue,
                Some(path) => PathBuf::from(path),
                None => return Ok(None),
            },
        };

        match load_schema(&mut optimizer, &path) {
            Ok(()) => break,
            Err(err) => eprintln!("Error: {:#}", err),
        }
    }

    Ok(Some(optimizer))
}

fn load_schema(optimizer: &mut QueryOptimizer, path: &Path) -> Result<()> {
    optimizer
        .load_schema_file(path)
        .with_context(|| format!("Could not load schema from {:?}", path))?;
    if let Some(description) = optimizer.schema().description() {
        println!(
            "Loaded schema for {} ({} tables).",
            description.version,
            description.table_names().len()
        );
    }
    Ok(())
}
