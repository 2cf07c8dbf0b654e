//! Logging system configuration and initialization
//!
//! - Console output and a daily rolling log file, each optional
//! - Structured JSON file logs (optional)
//! - Level from configuration, overridable with `RUST_LOG`
//! - Noisy HTTP and HTML parsing targets are held back unless `trace` is requested

use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::Local;
use once_cell::sync::Lazy;
use tracing::info;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

/// File name prefix of the rolling log; the appender adds the date
pub const LOG_FILE_NAME: &str = "efd-ptr-harvester.log";

// Keeps the non-blocking file writers alive for the life of the process
static LOG_GUARDS: Lazy<Mutex<Vec<WorkerGuard>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Dependency targets quieted below `trace`
const QUIET_TARGETS: &[(&str, &str)] = &[
    ("reqwest", "warn"),
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("h2", "warn"),
    ("html5ever", "warn"),
    ("selectors", "warn"),
    ("tokio", "info"),
];

/// Local wall-clock timestamps with milliseconds
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

/// Filter directives for `config`, most general first
pub fn filter_directives(config: &LoggingConfig) -> Vec<String> {
    let mut directives = vec![config.level.clone()];

    if !config.level.to_lowercase().contains("trace") {
        directives.extend(
            QUIET_TARGETS
                .iter()
                .map(|(target, level)| format!("{target}={level}")),
        );
    }

    let mut modules: Vec<_> = config.module_filters.iter().collect();
    modules.sort();
    directives.extend(modules.into_iter().map(|(target, level)| format!("{target}={level}")));

    directives
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    filter_directives(config)
        .iter()
        .try_fold(EnvFilter::new(""), |filter, directive| -> Result<EnvFilter> {
            let directive = directive
                .parse()
                .map_err(|e| anyhow!("Invalid log directive '{}': {}", directive, e))?;
            Ok(filter.add_directive(directive))
        })
}

/// Initialize logging with the default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LoggingConfig::default())
}

/// Initialize logging with custom configuration
///
/// `RUST_LOG` replaces the configured filter entirely:
/// ```bash
/// RUST_LOG="debug,reqwest=debug" efd-ptr-harvester
/// ```
pub fn init_logging_with_config(config: LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = build_env_filter(&config)?;

    let file_writer = if config.file_output {
        std::fs::create_dir_all(&config.log_dir).map_err(|e| {
            anyhow!("Failed to create log directory {:?}: {}", config.log_dir, e)
        })?;
        let (writer, guard) = non_blocking(rolling::daily(&config.log_dir, LOG_FILE_NAME));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(guard);
        Some(writer)
    } else {
        None
    };

    let (json_file_layer, plain_file_layer) = match file_writer {
        Some(writer) if config.json_format => (
            Some(
                fmt::Layer::new()
                    .json()
                    .with_writer(writer)
                    .with_timer(LocalTimeFormatter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false),
            ),
            None,
        ),
        Some(writer) => (
            None,
            Some(
                fmt::Layer::new()
                    .with_writer(writer)
                    .with_timer(LocalTimeFormatter)
                    .with_target(false)
                    .with_ansi(false),
            ),
        ),
        None => (None, None),
    };

    let console_layer = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(LocalTimeFormatter)
            .with_target(false)
    });

    Registry::default()
        .with(env_filter)
        .with(json_file_layer)
        .with(plain_file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!(
            "Log file: {:?} (daily rotation, JSON: {})",
            config.log_dir.join(LOG_FILE_NAME),
            config.json_format
        );
    }
    if config.level.to_lowercase().contains("trace") {
        info!("TRACE level active - HTTP and HTML parser logs are shown");
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== eFD PTR harvester ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    info!("Architecture: {}", std::env::consts::ARCH);

    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
}
