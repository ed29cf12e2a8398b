//! Runtime settings from the environment.
//!
//! | Variable                 | Default | Meaning                           |
//! |--------------------------|---------|-----------------------------------|
//! | `ROSTERLOAD_RULES`       | -       | Normalization rules JSON file     |
//! | `ROSTERLOAD_PORT`        | `3000`  | HTTP service port                 |
//! | `ROSTERLOAD_LOG_DIR`     | -       | Directory for per-run log files   |
//! | `ROSTERLOAD_LOG_FORMAT`  | `text`  | `text` or `json`                  |
//!
//! A `.env` file is loaded by the binary before these are read. Command-line
//! flags override them.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult, RulesResult};
use crate::rules::NormalizationRules;

pub const DEFAULT_PORT: u16 = 3000;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue {
                var: "ROSTERLOAD_LOG_FORMAT".into(),
                value: other.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub rules_path: Option<PathBuf>,
    pub port: u16,
    pub log_dir: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rules_path: None,
            port: DEFAULT_PORT,
            log_dir: None,
            log_format: LogFormat::Text,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("ROSTERLOAD_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "ROSTERLOAD_PORT".into(),
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let log_format = match get("ROSTERLOAD_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            rules_path: get("ROSTERLOAD_RULES").map(PathBuf::from),
            port,
            log_dir: get("ROSTERLOAD_LOG_DIR").map(PathBuf::from),
            log_format,
        })
    }

    /// Override the rules file, e.g. from a `--rules` flag.
    pub fn with_rules(&self, rules_path: Option<PathBuf>) -> Self {
        Self {
            rules_path: rules_path.or_else(|| self.rules_path.clone()),
            ..self.clone()
        }
    }

    /// Load the configured rules file, or the built-in defaults.
    pub fn load_rules(&self) -> RulesResult<NormalizationRules> {
        match &self.rules_path {
            Some(path) => NormalizationRules::from_file(path),
            None => Ok(NormalizationRules::default()),
        }
    }
}
