//! Console behaviour settings.

use serde::{Deserialize, Serialize};

/// How the console renders outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Display name of the console.
    pub name: String,

    /// Append the captured backtrace to declared command errors.
    pub include_stack_trace_in_command_errors: bool,

    /// Include the fault description in the message for undeclared errors.
    pub include_details_in_unexpected_errors: bool,

    /// Log `Command returned '<value>'` for commands that return a value.
    pub log_return_values: bool,

    /// Maximum number of console log entries kept in memory.
    pub history_limit: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            name: "conch".to_string(),
            include_stack_trace_in_command_errors: true,
            include_details_in_unexpected_errors: false,
            log_return_values: true,
            history_limit: 1000,
        }
    }
}

/// Application metadata shown by the `version` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    pub project_name: Option<String>,
    pub version: Option<String>,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
}

impl AppInfo {
    pub fn is_empty(&self) -> bool {
        self.project_name.is_none()
            && self.version.is_none()
            && self.engine.is_none()
            && self.engine_version.is_none()
    }

    /// One-line description, e.g. `demo v1.2.0, made with conch v0.1.0`.
    pub fn describe(&self) -> Option<String> {
        fn join(name: &Option<String>, version: &Option<String>) -> Option<String> {
            match (name, version) {
                (Some(n), Some(v)) => Some(format!("{n} v{v}")),
                (Some(n), None) => Some(n.clone()),
                (None, Some(v)) => Some(format!("v{v}")),
                (None, None) => None,
            }
        }

        let project = join(&self.project_name, &self.version);
        let engine = join(&self.engine, &self.engine_version);
        match (project, engine) {
            (Some(p), Some(e)) => Some(format!("{p}, made with {e}")),
            (Some(p), None) => Some(p),
            (None, Some(e)) => Some(format!("Made with {e}")),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_defaults() {
        let config = ConsoleConfig::default();
        assert!(config.include_stack_trace_in_command_errors);
        assert!(!config.include_details_in_unexpected_errors);
        assert!(config.log_return_values);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: ConsoleConfig =
            serde_json::from_str(r#"{"include_details_in_unexpected_errors": true}"#).unwrap();
        assert!(config.include_details_in_unexpected_errors);
        assert_eq!(config.history_limit, 1000);
    }

    #[test]
    fn test_app_info_describe() {
        let info = AppInfo {
            project_name: Some("demo".into()),
            version: Some("1.2.0".into()),
            engine: Some("conch".into()),
            engine_version: Some("0.1.0".into()),
        };
        assert_eq!(
            info.describe().as_deref(),
            Some("demo v1.2.0, made with conch v0.1.0")
        );
        assert_eq!(AppInfo::default().describe(), None);
        assert!(AppInfo::default().is_empty());
    }
}
