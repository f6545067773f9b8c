//! Cache configuration with user-tunable limits.
//!
//! Configuration can be loaded from a file, environment variables, or
//! created programmatically. All three eviction limits (entry count,
//! aggregate size, entry age) are independent; exceeding any one of them
//! triggers eviction.

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Configuration for the thumbnail cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached entries
    pub max_entries: usize,
    /// Maximum aggregate payload size in bytes
    pub max_total_size: usize,
    /// Maximum entry age before expiry
    pub expiry: Duration,
    /// Interval between background expiry sweeps
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            max_total_size: 200 * 1024 * 1024,            // 200 MB
            expiry: Duration::from_secs(24 * 60 * 60),    // 24 hours
            sweep_interval: Duration::from_secs(60 * 60), // 1 hour
        }
    }
}

impl CacheConfig {
    /// Create a configuration with custom limits.
    ///
    /// # Arguments
    /// * `max_entries` - maximum number of cached entries
    /// * `max_total_mb` - maximum aggregate payload size in megabytes
    /// * `expiry_hours` - maximum entry age in hours
    pub fn new(max_entries: usize, max_total_mb: usize, expiry_hours: u64) -> Self {
        Self {
            max_entries,
            max_total_size: max_total_mb * 1024 * 1024,
            expiry: Duration::from_secs(expiry_hours * 60 * 60),
            ..Self::default()
        }
    }

    /// Sets the maximum number of entries.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Sets the aggregate size limit in megabytes.
    pub fn with_max_total_mb(mut self, mb: usize) -> Self {
        self.max_total_size = mb * 1024 * 1024;
        self
    }

    /// Sets the aggregate size limit in bytes.
    pub fn with_max_total_size(mut self, bytes: usize) -> Self {
        self.max_total_size = bytes;
        self
    }

    /// Sets the entry expiry duration.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    /// Sets the background sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Returns the aggregate size limit in megabytes.
    pub fn max_total_mb(&self) -> usize {
        self.max_total_size / (1024 * 1024)
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PAPERDROP_CACHE_MAX_ENTRIES`: maximum entry count (default: 50)
    /// - `PAPERDROP_CACHE_MB`: aggregate size limit in MB (default: 200)
    /// - `PAPERDROP_CACHE_EXPIRY_HOURS`: entry expiry in hours (default: 24)
    /// - `PAPERDROP_CACHE_SWEEP_MINUTES`: sweep interval in minutes (default: 60)
    ///
    /// # Errors
    /// Returns an error if any variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PAPERDROP_CACHE_MAX_ENTRIES") {
            config.max_entries = val
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("PAPERDROP_CACHE_MAX_ENTRIES".to_string()))?;
        }

        if let Ok(val) = std::env::var("PAPERDROP_CACHE_MB") {
            config.max_total_size = val
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("PAPERDROP_CACHE_MB".to_string()))?
                * 1024
                * 1024;
        }

        if let Ok(val) = std::env::var("PAPERDROP_CACHE_EXPIRY_HOURS") {
            let hours = val
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue("PAPERDROP_CACHE_EXPIRY_HOURS".to_string()))?;
            config.expiry = Duration::from_secs(hours * 60 * 60);
        }

        if let Ok(val) = std::env::var("PAPERDROP_CACHE_SWEEP_MINUTES") {
            let minutes = val
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue("PAPERDROP_CACHE_SWEEP_MINUTES".to_string()))?;
            config.sweep_interval = Duration::from_secs(minutes * 60);
        }

        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Expected file format:
    /// ```toml
    /// max_entries = 50
    /// max_total_mb = 200
    /// expiry_hours = 24
    /// sweep_minutes = 60
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(ConfigError::IoError)?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from a TOML string.
    fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in toml_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');

                match key {
                    "max_entries" => {
                        config.max_entries = value
                            .parse::<usize>()
                            .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
                    }
                    "max_total_mb" => {
                        config.max_total_size = value
                            .parse::<usize>()
                            .map_err(|_| ConfigError::InvalidValue(key.to_string()))?
                            * 1024
                            * 1024;
                    }
                    "expiry_hours" => {
                        let hours = value
                            .parse::<u64>()
                            .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
                        config.expiry = Duration::from_secs(hours * 60 * 60);
                    }
                    "sweep_minutes" => {
                        let minutes = value
                            .parse::<u64>()
                            .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
                        config.sweep_interval = Duration::from_secs(minutes * 60);
                    }
                    _ => {} // Ignore unknown keys
                }
            }
        }

        Ok(config)
    }

    /// Saves configuration to a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_toml()).map_err(ConfigError::IoError)
    }

    /// Converts configuration to TOML format.
    fn to_toml(&self) -> String {
        format!(
            "# Paperdrop Cache Configuration\n\
             max_entries = {}\n\
             max_total_mb = {}\n\
             expiry_hours = {}\n\
             sweep_minutes = {}\n",
            self.max_entries,
            self.max_total_mb(),
            self.expiry.as_secs() / (60 * 60),
            self.sweep_interval.as_secs() / 60,
        )
    }
}

/// Errors that can occur during configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    InvalidValue(String),
    /// I/O error reading or writing a configuration file
    IoError(io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(key) => {
                write!(f, "Invalid value for configuration key: {}", key)
            }
            ConfigError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
