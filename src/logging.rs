//! Logging setup
//!
//! Logs always go to stderr or a file: stdout carries the protocol.

use crate::config::{LogFormat, LoggingSettings};
use crate::types::Result;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, Level};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_LEVEL_ENV: &str = "MCP_RUNTIME_LOG_LEVEL";

/// Dependency targets that are lowered to `warn` with `quiet_libraries`.
const NOISY_TARGETS: &[&str] = &["tokio", "runtime", "mio"];

/// Map a level name (any case) to a tracing level; unknown names give INFO.
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" | "critical" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Configured level, then `MCP_RUNTIME_LOG_LEVEL`, then INFO.
pub fn resolve_level(settings: &LoggingSettings) -> Level {
    settings
        .level
        .clone()
        .or_else(|| std::env::var(LOG_LEVEL_ENV).ok())
        .map(|name| parse_level(&name))
        .unwrap_or(Level::INFO)
}

pub fn build_filter(settings: &LoggingSettings) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env().add_directive(resolve_level(settings).into());

    if settings.quiet_libraries {
        for target in NOISY_TARGETS {
            if let Ok(directive) = format!("{}=warn", target).parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    filter
}

/// Install the global subscriber.
///
/// Returns `Ok(false)` if a subscriber was already installed.
pub fn configure_logging(settings: &LoggingSettings, log_file: Option<&Path>) -> Result<bool> {
    let writer = match log_file {
        Some(path) => BoxMakeWriter::new(Mutex::new(std::fs::File::create(path)?)),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = fmt()
        .with_env_filter(build_filter(settings))
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .with_target(true);

    let installed = match settings.format {
        LogFormat::Full => builder
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if let Err(e) = &installed {
        debug!("Logging already configured: {}", e);
    }

    Ok(installed.is_ok())
}
