//! # Configuration Management
//!
//! Centralized configuration for the codec.
//!
//! Both ends of a connection must agree on the stream-mode cache bounds out of
//! band: the writer mirrors the reader's eviction so that back-reference
//! indices stay aligned.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`

use crate::error::{CodecError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Default maximum number of entries kept by the stream-mode cache
pub const STREAM_MAX_CACHE_ENTRIES: usize = 64;

/// Default maximum byte length of a text/binary value eligible for stream-mode caching
pub const STREAM_MAX_ITEM_SIZE: usize = 256;

/// Max allowed declared length of a single payload (e.g. 16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Default maximum nesting depth of lists and dictionaries on decode
pub const MAX_DEPTH: usize = 512;

/// Main codec configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct CodecConfig {
    /// Stream-mode cache bounds
    #[serde(default)]
    pub stream: StreamCacheConfig,

    /// Decoder resource limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CodecConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| CodecError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| CodecError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| CodecError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(entries) = std::env::var("BOSS_CODEC_STREAM_MAX_ENTRIES") {
            config.stream.max_cache_entries = entries.parse::<usize>().map_err(|e| {
                CodecError::ConfigError(format!("Invalid BOSS_CODEC_STREAM_MAX_ENTRIES: {e}"))
            })?;
        }

        if let Ok(size) = std::env::var("BOSS_CODEC_STREAM_MAX_ITEM_SIZE") {
            config.stream.max_item_size = size.parse::<usize>().map_err(|e| {
                CodecError::ConfigError(format!("Invalid BOSS_CODEC_STREAM_MAX_ITEM_SIZE: {e}"))
            })?;
        }

        if let Ok(size) = std::env::var("BOSS_CODEC_MAX_PAYLOAD_SIZE") {
            config.limits.max_payload_size = size.parse::<usize>().map_err(|e| {
                CodecError::ConfigError(format!("Invalid BOSS_CODEC_MAX_PAYLOAD_SIZE: {e}"))
            })?;
        }

        if let Ok(depth) = std::env::var("BOSS_CODEC_MAX_DEPTH") {
            config.limits.max_depth = depth.parse::<usize>().map_err(|e| {
                CodecError::ConfigError(format!("Invalid BOSS_CODEC_MAX_DEPTH: {e}"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CodecError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| CodecError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.stream.validate());
        errors.extend(self.limits.validate());
        errors.extend(self.logging.validate());

        if self.stream.max_item_size > self.limits.max_payload_size {
            errors.push(
                "Stream max item size cannot be larger than max payload size".to_string(),
            );
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CodecError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Bounded cache policy used once a session enters stream mode
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct StreamCacheConfig {
    /// Maximum number of cached values; the oldest is evicted first
    pub max_cache_entries: usize,

    /// Text/binary values longer than this (in bytes) are never cached
    pub max_item_size: usize,
}

impl Default for StreamCacheConfig {
    fn default() -> Self {
        Self {
            max_cache_entries: STREAM_MAX_CACHE_ENTRIES,
            max_item_size: STREAM_MAX_ITEM_SIZE,
        }
    }
}

impl StreamCacheConfig {
    /// Validate stream cache configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_cache_entries == 0 {
            errors.push("Stream max cache entries must be greater than 0".to_string());
        } else if self.max_cache_entries > 1_000_000 {
            errors.push(format!(
                "Stream max cache entries too large: {} (max recommended: 1,000,000)",
                self.max_cache_entries
            ));
        }

        if self.max_item_size == 0 {
            errors.push("Stream max item size must be greater than 0".to_string());
        }

        errors
    }
}

/// Decoder resource limits
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct LimitsConfig {
    /// Maximum declared length of a single text/binary payload or container
    pub max_payload_size: usize,

    /// Maximum nesting depth of lists and dictionaries
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    MAX_DEPTH
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_size: MAX_PAYLOAD_SIZE,
            max_depth: MAX_DEPTH,
        }
    }
}

impl LimitsConfig {
    /// Validate limits configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_payload_size == 0 {
            errors.push("Max payload size cannot be 0".to_string());
        } else if self.max_payload_size > 1024 * 1024 * 1024 {
            errors.push(format!(
                "Max payload size too large: {} bytes (maximum recommended: 1 GB)",
                self.max_payload_size
            ));
        }

        if self.max_depth == 0 {
            errors.push("Max depth cannot be 0".to_string());
        } else if self.max_depth > 100_000 {
            errors.push(format!(
                "Max depth too large: {} (deep nesting can overflow the decoder stack)",
                self.max_depth
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("boss-codec"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
