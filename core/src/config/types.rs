use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};

use crate::error::RunnerError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub transcript: TranscriptConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr. Shares the terminal with the relayed child stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "warn" or "tapline_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Command interpreter used to run the command string.
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Flag that makes `shell` execute its next argument as a command string.
    #[serde(default = "default_shell_arg")]
    pub shell_arg: String,

    /// Exit with the child's exit code instead of 0.
    #[serde(default)]
    pub propagate_exit_code: bool,
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_shell_arg() -> String {
    "-c".to_string()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            shell_arg: default_shell_arg(),
            propagate_exit_code: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// chrono format string for the entry timestamp (local time).
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    #[serde(default = "default_flush_each_entry")]
    pub flush_each_entry: bool,
}

fn default_timestamp_format() -> String {
    "%b %e %H:%M:%S%.3f".to_string()
}

fn default_flush_each_entry() -> bool {
    true
}

impl TranscriptConfig {
    /// Rejects timestamp formats chrono can't render.
    pub fn validate(&self) -> Result<(), RunnerError> {
        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(RunnerError::Config(format!(
                "invalid transcript timestamp format: {:?}",
                self.timestamp_format
            )));
        }
        Ok(())
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            timestamp_format: default_timestamp_format(),
            flush_each_entry: default_flush_each_entry(),
        }
    }
}
