//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ConchConfig, LogOutput, LoggingConfig, RuntimeConfig};
use conch_framework::ConsoleConfig;

/// Validates the entire configuration.
pub fn validate_config(config: &ConchConfig) -> ConfigResult<()> {
    validate_console_config(&config.console)?;
    validate_logging_config(&config.logging)?;
    validate_runtime_config(&config.runtime)?;
    Ok(())
}

fn validate_console_config(console: &ConsoleConfig) -> ConfigResult<()> {
    if console.name.trim().is_empty() {
        return Err(ConfigError::missing_field("console.name"));
    }
    if console.history_limit == 0 {
        return Err(ConfigError::invalid(
            "console.history_limit must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        let Some(path) = &logging.file_path else {
            return Err(ConfigError::missing_field("logging.file_path"));
        };
        if path.is_dir() {
            return Err(ConfigError::invalid_path(path, "is a directory"));
        }
        if logging.max_files == 0 {
            return Err(ConfigError::invalid(
                "logging.max_files must be greater than 0",
            ));
        }
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty() || m.contains('=')) {
        return Err(ConfigError::invalid(format!(
            "Invalid module filter name: '{module}'"
        )));
    }

    Ok(())
}

fn validate_runtime_config(runtime: &RuntimeConfig) -> ConfigResult<()> {
    if runtime.output_buffer == 0 {
        return Err(ConfigError::invalid(
            "runtime.output_buffer must be greater than 0",
        ));
    }
    if let Some(path) = &runtime.mirror_path
        && path.is_dir()
    {
        return Err(ConfigError::invalid_path(path, "is a directory"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingLevel;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&ConchConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_history_limit() {
        let mut config = ConchConfig::default();
        config.console.history_limit = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = ConchConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));

        config.logging.file_path = Some("conch.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_mirror_path_must_not_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ConchConfig::default();
        config.runtime.mirror_path = Some(dir.path().to_path_buf());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_bad_filter_name() {
        let mut config = ConchConfig::default();
        config
            .logging
            .filters
            .insert("conch=debug".into(), LoggingLevel::Trace);
        assert!(validate_config(&config).is_err());
    }
}
