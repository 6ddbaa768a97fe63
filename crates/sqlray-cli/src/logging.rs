//! Logging setup for the command-line tool
//!
//! Console output goes to stderr so that stdout stays clean for results and
//! `--json` output. JSON file logs are opt-in.

use anyhow::Context;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_FILTER: &str =
    "warn,sqlray_cli=info,sqlray_core=info,sqlray_ai=info,sqlray_settings=info";
const VERBOSE_FILTER: &str =
    "warn,sqlray_cli=debug,sqlray_core=debug,sqlray_ai=debug,sqlray_settings=debug";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where JSON log files are written
    pub log_dir: PathBuf,

    /// Whether to also write JSON logs to `log_dir`
    pub enable_json_logs: bool,

    /// Debug level for SQLRay targets, overriding RUST_LOG
    pub verbose: bool,
}

impl LoggingConfig {
    pub fn new(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            enable_json_logs: false,
            verbose: false,
        }
    }

    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.enable_json_logs = enabled;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        if self.verbose {
            return EnvFilter::new(VERBOSE_FILTER);
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initializes the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held until
/// the program exits.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let mut layers = Vec::new();

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.verbose)
        .with_span_events(if config.verbose {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        })
        .compact()
        .with_filter(config.env_filter())
        .boxed();
    layers.push(console_layer);

    let mut guard = None;
    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)
            .with_context(|| format!("Failed to create log directory {:?}", config.log_dir))?;

        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "sqlray.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(config.env_filter())
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("Logging already initialized")?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        "Logging initialized"
    );

    Ok(guard)
}
