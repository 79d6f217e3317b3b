use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
    #[error("failed to parse {name} as year-month (expected YYYY-MM): {value}")]
    ParseMonth { name: String, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Discovery
    pub api_timeout: Duration,
    pub snapshot_limit: usize,
    pub from_month: Option<String>,
    pub to_month: Option<String>,

    // Extraction
    pub content_timeout: Duration,
    pub retry_count: u32,
    pub request_delay: Duration,
    pub rate_limit_backoff: Duration,
    pub auto_detect_categories: bool,
    pub auto_detect_tags: bool,

    // Export
    pub output_dir: PathBuf,
    pub items_per_file: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable holds an unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Discovery
            api_timeout: Duration::from_secs(parse_env_u64("API_TIMEOUT_SECS", 60)?),
            snapshot_limit: parse_env_usize(
                "SNAPSHOT_LIMIT",
                crate::constants::SNAPSHOT_ROW_LIMIT,
            )?,
            from_month: parse_env_month("FROM_MONTH")?,
            to_month: parse_env_month("TO_MONTH")?,

            // Extraction
            content_timeout: Duration::from_secs(parse_env_u64("CONTENT_TIMEOUT_SECS", 30)?),
            retry_count: parse_env_u32("RETRY_COUNT", 3)?,
            request_delay: Duration::from_secs(parse_env_u64("REQUEST_DELAY_SECS", 3)?),
            rate_limit_backoff: Duration::from_secs(parse_env_u64("RATE_LIMIT_BACKOFF_SECS", 30)?),
            auto_detect_categories: parse_env_bool("AUTO_DETECT_CATEGORIES", true)?,
            auto_detect_tags: parse_env_bool("AUTO_DETECT_TAGS", true)?,

            // Export
            output_dir: PathBuf::from(env_or_default("OUTPUT_DIR", "./exports")),
            items_per_file: parse_env_usize("ITEMS_PER_FILE", 0)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_count == 0 {
            return Err(ConfigError::InvalidValue {
                name: "RETRY_COUNT".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.snapshot_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: "SNAPSHOT_LIMIT".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if let (Some(from), Some(to)) = (&self.from_month, &self.to_month) {
            if from > to {
                return Err(ConfigError::InvalidValue {
                    name: "FROM_MONTH".to_string(),
                    message: format!("range start {from} is after range end {to}"),
                });
            }
        }
        Ok(())
    }

    /// Configuration with short timeouts and no pacing, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            api_timeout: Duration::from_secs(5),
            snapshot_limit: crate::constants::SNAPSHOT_ROW_LIMIT,
            from_month: None,
            to_month: None,
            content_timeout: Duration::from_secs(5),
            retry_count: 2,
            request_delay: Duration::ZERO,
            rate_limit_backoff: Duration::from_millis(10),
            auto_detect_categories: true,
            auto_detect_tags: true,
            output_dir: PathBuf::from("./exports"),
            items_per_file: 0,
        }
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

/// Parse an optional `YYYY-MM` month boundary.
fn parse_env_month(name: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => {
            let valid = val.len() == 7
                && val.as_bytes()[4] == b'-'
                && val[..4].chars().all(|c| c.is_ascii_digit())
                && val[5..].chars().all(|c| c.is_ascii_digit());
            if valid {
                Ok(Some(val))
            } else {
                Err(ConfigError::ParseMonth {
                    name: name.to_string(),
                    value: val,
                })
            }
        }
        _ => Ok(None),
    }
}
