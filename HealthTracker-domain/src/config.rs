//! Runtime configuration for the domain services.
//!
//! Every value comes from the environment (a `.env` file is loaded by the
//! binary beforehand). Unparsable numbers fall back to their defaults with a
//! warning; unknown device types are rejected.

use std::env;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;
use tracing::{info, warn};

use health_tracker_data::database::{DatabaseConfig, DatabaseError};
use health_tracker_data::models::DeviceType;

/// Default chat completion endpoint
pub const DEFAULT_COMPLETION_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Settings of the time-windowed aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationConfig {
    /// Device types reported by `fetch_health_data`, in output order
    pub device_types: Vec<DeviceType>,
    /// Length of the trailing window, in days
    pub window_days: u32,
}

/// Longest accepted aggregation window, one century
pub const MAX_WINDOW_DAYS: u32 = 36_500;

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            device_types: vec![DeviceType::Smartwatch, DeviceType::HealthHub],
            window_days: 7,
        }
    }
}

impl AggregationConfig {
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let device_types = match lookup("AGGREGATION_DEVICE_TYPES") {
            Some(raw) => parse_device_types(&raw)?,
            None => defaults.device_types,
        };

        let window_days = parse_or_default(lookup, "AGGREGATION_WINDOW_DAYS", defaults.window_days);
        if window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::InvalidValue {
                key: "AGGREGATION_WINDOW_DAYS",
                message: format!("{} exceeds the maximum of {} days", window_days, MAX_WINDOW_DAYS),
            });
        }

        Ok(Self {
            device_types,
            window_days,
        })
    }

    /// The trailing window as a duration
    pub fn window(&self) -> Duration {
        Duration::days(i64::from(self.window_days))
    }
}

fn parse_device_types(raw: &str) -> Result<Vec<DeviceType>, ConfigError> {
    let mut device_types = Vec::new();
    for label in raw.split(',').map(str::trim).filter(|label| !label.is_empty()) {
        let device_type = label.parse::<DeviceType>().map_err(|e| ConfigError::InvalidValue {
            key: "AGGREGATION_DEVICE_TYPES",
            message: e.to_string(),
        })?;
        if !device_types.contains(&device_type) {
            device_types.push(device_type);
        }
    }

    if device_types.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "AGGREGATION_DEVICE_TYPES",
            message: "at least one device type is required".to_string(),
        });
    }
    Ok(device_types)
}

/// Settings of the outbound completion API used for summaries
#[derive(Clone, PartialEq)]
pub struct SummarizationConfig {
    /// Bearer token; without it no request is made and the fallback summary is returned
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further retry
    pub retry_backoff_ms: u64,
}

// Keeps the API key out of logs
impl fmt::Debug for SummarizationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizationConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_COMPLETION_URL.to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 160,
            timeout_seconds: 30,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl SummarizationConfig {
    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            api_key: lookup("COMPLETION_API_KEY").filter(|key| !key.trim().is_empty()),
            api_url: lookup("COMPLETION_API_URL").unwrap_or(defaults.api_url),
            model: lookup("COMPLETION_MODEL").unwrap_or(defaults.model),
            max_tokens: parse_or_default(lookup, "COMPLETION_MAX_TOKENS", defaults.max_tokens),
            timeout_seconds: parse_or_default(lookup, "COMPLETION_TIMEOUT_SECONDS", defaults.timeout_seconds),
            max_retries: parse_or_default(lookup, "COMPLETION_MAX_RETRIES", defaults.max_retries),
            retry_backoff_ms: parse_or_default(lookup, "COMPLETION_RETRY_BACKOFF_MS", defaults.retry_backoff_ms),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub aggregation: AggregationConfig,
    pub summarization: SummarizationConfig,
}

impl AppConfig {
    /// Load the configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = DatabaseConfig::from_lookup(&lookup)?;
        let aggregation = AggregationConfig::from_lookup(&lookup)?;
        let summarization = SummarizationConfig::from_lookup(&lookup);

        if summarization.api_key.is_none() {
            warn!("COMPLETION_API_KEY is not set; summaries will use the fallback text");
        }
        info!(
            "Aggregation over {:?} with a {}-day window",
            aggregation.device_types, aggregation.window_days
        );

        Ok(Self {
            database,
            aggregation,
            summarization,
        })
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + fmt::Display + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}='{}', using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
