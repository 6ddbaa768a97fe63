//! SQLRay command-line interface
//!
//! Suggests faster SQL (plus supporting DDL such as indexes) by showing an
//! LLM the query together with the relevant slice of a schema description.
//!
//! ```text
//! sqlray optimize -s schema.json -q "SELECT * FROM orders WHERE status = 'open'"
//! sqlray optimize -s schema.json -f slow.sql --json
//! sqlray interactive -s schema.json
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sqlray_settings::SqlRaySettings;
use std::path::PathBuf;

mod interactive;
mod logging;
mod output;
mod query_input;
mod session;

use session::ProviderArgs;

#[derive(Parser, Debug)]
#[command(name = "sqlray", version, about = "LLM-assisted SQL query optimizer")]
struct Cli {
    /// Debug logging for SQLRay components
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write JSON logs to the SQLRay log directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Optimize a single query
    Optimize(OptimizeArgs),

    /// Optimize queries one after another at a prompt
    Interactive(InteractiveArgs),
}

#[derive(Args, Debug)]
struct OptimizeArgs {
    /// Path to the JSON schema description
    #[arg(short, long)]
    schema: PathBuf,

    /// SQL query to optimize
    #[arg(short, long)]
    query: Option<String>,

    /// File containing the SQL query
    #[arg(short = 'f', long)]
    query_file: Option<PathBuf>,

    #[command(flatten)]
    provider: ProviderArgs,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Show the extracted tables and the optimization prompt without sending it
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct InteractiveArgs {
    /// Path to the JSON schema description; asked for when missing
    #[arg(short, long)]
    schema: Option<PathBuf>,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = sqlray_settings::log_dir().unwrap_or_else(|_| PathBuf::from("logs"));
    let _log_guard = logging::init(
        &logging::LoggingConfig::new(log_dir)
            .with_json_logs(cli.log_file)
            .with_verbose(cli.verbose),
    )?;

    let settings = load_settings();

    match cli.command {
        Commands::Optimize(args) => optimize(args, &settings).await,
        Commands::Interactive(args) => interactive::run(args.provider, args.schema, settings).await,
    }
}

fn load_settings() -> SqlRaySettings {
    settings_or_default(SqlRaySettings::load())
}

/// Flags can supply everything a run needs, so unreadable settings only warn.
fn settings_or_default(loaded: Result<SqlRaySettings>) -> SqlRaySettings {
    loaded.unwrap_or_else(|err| {
        tracing::warn!(error = %format!("{:#}", err), "Could not load settings, using defaults");
        SqlRaySettings::default()
    })
}

async fn optimize(args: OptimizeArgs, settings: &SqlRaySettings) -> Result<()> {
    let query = query_input::read_query(args.query.as_deref(), args.query_file.as_deref())?;

    let config = args.provider.resolve(settings);
    let mut optimizer = config.build_optimizer()?;
    if args.provider.save_settings {
        config.save_settings(settings)?;
    }
    optimizer
        .load_schema_file(&args.schema)
        .with_context(|| format!("Could not load schema from {:?}", args.schema))?;

    if args.dry_run {
        let request = optimizer
            .prepare(&query)
            .await
            .context("Table extraction failed")?;
        print!("{}", output::format_dry_run(&request));
        return Ok(());
    }

    let result = optimizer
        .optimize(&query)
        .await
        .context("Query optimization failed")?;

    if args.json {
        output::print_json(&result)?;
    } else {
        output::print_result(&result);
    }
    Ok(())
}
