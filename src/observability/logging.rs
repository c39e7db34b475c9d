//! Structured logging configuration.

use crate::config::{LogFormat, ObservabilityConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Resolved logging settings.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter applied to every layer.
    pub filter: EnvFilter,
    /// Optional output file; stderr otherwise.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging settings.
    ///
    /// `RUST_LOG` wins over the configured level; `verbose` forces `debug`
    /// for this crate.
    #[must_use]
    pub fn from_settings(settings: &ObservabilityConfig, verbose: bool) -> Self {
        let directive = if verbose {
            format!("{},claimcheck=debug", settings.log_level)
        } else {
            settings.log_level.clone()
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"))
        });

        Self {
            format: settings.log_format,
            filter,
            file: settings.log_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_are_carried_over() {
        let settings = ObservabilityConfig {
            log_format: LogFormat::Json,
            log_file: Some(PathBuf::from("/tmp/claimcheck.log")),
            ..ObservabilityConfig::default()
        };
        let config = LoggingConfig::from_settings(&settings, true);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, settings.log_file);
    }

    #[test]
    fn test_invalid_level_falls_back() {
        let settings = ObservabilityConfig {
            log_level: "[[not a directive".to_string(),
            ..ObservabilityConfig::default()
        };
        let config = LoggingConfig::from_settings(&settings, false);
        assert!(config.file.is_none());
    }
}
