//! Logging initialisation via tracing-subscriber.
//!
//! The subscriber is installed once, after config is resolved. `RUST_LOG`
//! wins over the configured level when it is set and parses.

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::AppError;

/// Filter directives for a configured level: our crate at `level`, noisy
/// HTTP dependencies capped at `warn` unless the level is stricter.
pub fn directives(level: &str) -> Result<String, AppError> {
    let parsed = parse_level(level)?;
    let deps = if parsed < LevelFilter::WARN { level } else { "warn" };
    Ok(format!("subsaver={level},hyper={deps},reqwest={deps},rustls={deps}"))
}

/// Install the global subscriber. Logs go to stderr unless `log_file` is set.
pub fn init(level: &str, log_file: Option<&Path>) -> Result<(), AppError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directives(level)?)
            .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))?,
    };

    let writer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    AppError::Logger(format!("failed to open log file '{}': {e}", path.display()))
                })?;
            BoxMakeWriter::new(file)
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Validate a level string before it reaches the filter builder.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_levels_parse() {
        for l in ["error", "warn", "info", "debug", "trace"] {
            assert!(parse_level(l).is_ok(), "expected '{l}' to be valid");
        }
    }

    #[test]
    fn unknown_levels_rejected() {
        assert!(parse_level("verbose").is_err());
        assert!(parse_level("").is_err());
    }

    #[test]
    fn dependencies_capped_at_warn_for_verbose_levels() {
        let d = directives("debug").unwrap();
        assert!(d.starts_with("subsaver=debug"));
        assert!(d.contains("reqwest=warn"));
    }

    #[test]
    fn dependencies_follow_strict_levels() {
        let d = directives("error").unwrap();
        assert!(d.contains("hyper=error"));
    }
}
