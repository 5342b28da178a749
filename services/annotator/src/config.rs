//! Annotator service configuration.

use std::env;
use std::path::PathBuf;

/// Default location of the override rule configuration.
pub const DEFAULT_CONFIG_FILE: &str = "/etc/annotator/annotator_config.json";

/// Output format of log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Parse a format name, falling back to JSON.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Override rule configuration file
    pub rules_file: PathBuf,
    pub log_format: LogFormat,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            rules_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            log_format: LogFormat::Json,
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("ANNOTATOR_CONFIG_FILE") {
            config.rules_file = PathBuf::from(val);
        }

        if let Ok(val) = env::var("ANNOTATOR_LOG_FORMAT") {
            config.log_format = LogFormat::from_str(&val);
        }

        if let Ok(val) = env::var("ANNOTATOR_LOG_LEVEL") {
            config.log_level = val;
        }

        config
    }

    /// Apply command-line overrides.
    pub fn with_overrides(
        mut self,
        rules_file: Option<PathBuf>,
        log_format: Option<&str>,
        log_level: Option<&str>,
    ) -> Self {
        if let Some(rules_file) = rules_file {
            self.rules_file = rules_file;
        }
        if let Some(log_format) = log_format {
            self.log_format = LogFormat::from_str(log_format);
        }
        if let Some(log_level) = log_level {
            self.log_level = log_level.to_string();
        }
        self
    }
}
