//! Configuration management for deep population
//!
//! Settings come from `deep-populate.toml` when present, then `DP_*`
//! environment variables, and are validated before use.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::types::{Error, PopulateOptions, Result, SchemaRegistry};

/// Default config file name looked up by [`Config::load`]
pub const CONFIG_FILE: &str = "deep-populate.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Execution settings for population runs
    pub populate: PopulateSettings,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Default populate options per root type; listing a type enables it
    pub types: BTreeMap<String, PopulateOptions>,
}

/// Execution settings shared by every resolution of a populator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulateSettings {
    /// Attach plain objects instead of entities
    pub lean: bool,

    /// Maximum fetches in flight within one level (0 = no cap)
    pub max_concurrent_fetches: usize,

    /// Upper bound on a single fetch
    #[serde(with = "optional_duration", skip_serializing_if = "Option::is_none")]
    pub fetch_timeout: Option<Duration>,
}

impl PopulateSettings {
    /// Concurrency to use for a level of `fetches` fetches
    pub fn concurrency_limit(&self, fetches: usize) -> usize {
        match self.max_concurrent_fetches {
            0 => fetches.max(1),
            cap => cap.min(fetches.max(1)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default config file and environment variables
    pub fn load() -> Result<Self> {
        let mut config = if Path::new(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Config::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load and validate configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("Failed to read config file {}: {}", path.as_ref().display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        use std::env;

        if let Ok(level) = env::var("DP_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = env::var("DP_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(lean) = env::var("DP_LEAN") {
            self.populate.lean = parse_bool(&lean)
                .ok_or_else(|| Error::config(format!("Invalid DP_LEAN value: {}", lean)))?;
        }

        if let Ok(max) = env::var("DP_MAX_CONCURRENT_FETCHES") {
            self.populate.max_concurrent_fetches = max.parse()
                .map_err(|e| Error::config(format!("Invalid max concurrent fetches: {}", e)))?;
        }

        if let Ok(timeout) = env::var("DP_FETCH_TIMEOUT") {
            self.populate.fetch_timeout = Some(parse_duration(&timeout).map_err(Error::config)?);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(Error::config(format!("Invalid log level: {}", other))),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => return Err(Error::config(format!("Invalid log format: {}", other))),
        }

        if self.populate.fetch_timeout == Some(Duration::ZERO) {
            return Err(Error::config("Fetch timeout must be greater than zero"));
        }

        for (name, options) in &self.types {
            if name.trim().is_empty() {
                return Err(Error::config("Empty type name in [types]"));
            }
            if let Some(rewrite) = &options.rewrite {
                if rewrite.iter().any(|(alias, canonical)| alias.trim().is_empty() || canonical.trim().is_empty()) {
                    return Err(Error::config(format!("Empty rewrite rule for type {}", name)));
                }
            }
        }

        Ok(())
    }

    /// Enable deep population on every configured type
    pub fn register_types(&self, registry: &SchemaRegistry) -> Result<()> {
        for (name, options) in &self.types {
            registry.enable_deep_populate(name.as_str(), options.clone())?;
        }
        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse durations like `"250ms"`, `"5s"`, `"2m"`, `"1h"` or raw seconds
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(split) => s.split_at(split),
        None => (s, "s"),
    };
    let value: u64 = digits.parse().map_err(|_| format!("Invalid duration format: {}", s))?;
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        _ => Err(format!("Invalid duration unit in {}", s)),
    }
}

// Durations are written as strings so config files stay readable
mod optional_duration {
    use std::fmt;
    use std::time::Duration;
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(duration) => serializer.serialize_str(&format!("{}ms", duration.as_millis())),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl<'de> Visitor<'de> for DurationVisitor {
            type Value = Option<Duration>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a duration string like '250ms' or '5s'")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                super::parse_duration(value).map(Some).map_err(E::custom)
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Some(Duration::from_secs(value)))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(value)
                    .map(|secs| Some(Duration::from_secs(secs)))
                    .map_err(|_| E::custom("duration must not be negative"))
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(None)
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}
