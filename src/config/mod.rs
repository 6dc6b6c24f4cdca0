//! # Configuration Management Module
//!
//! Configuration for the object store and the `octane` binary, loaded from
//! TOML.
//!
//! ## Configuration Structure
//!
//! - [`StoreConfig`] - Object store tuning (arena capacity, lifecycle tracing)
//! - [`LoggingConfig`] - Log level and optional log file
//! - [`DemoConfig`] - Settings for the bundled demo world
//!
//! ## Usage
//!
//! ```rust,no_run
//! use octane::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("octane.toml").await?;
//!     println!("Arena capacity: {}", config.store.initial_capacity);
//!
//!     Config::create_default("octane.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [store]
//! initial_capacity = 256
//! trace_lifecycle = false
//! warn_on_transient_retention = true
//!
//! [logging]
//! level = "info"
//! file = "octane.log"
//!
//! [demo]
//! turns = 3
//! ```
//!
//! Every section is optional; missing values fall back to defaults.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Slots preallocated for the object arena and intact list.
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
    /// Emit a debug record for every creation, start and property write.
    #[serde(default)]
    pub trace_lifecycle: bool,
    /// Warn when a sweep moves an unreachable transient into the safety set.
    #[serde(default = "default_warn_on_transient_retention")]
    pub warn_on_transient_retention: bool,
}

fn default_initial_capacity() -> usize {
    256
}

fn default_warn_on_transient_retention() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            trace_lifecycle: false,
            warn_on_transient_retention: default_warn_on_transient_retention(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Parsed level filter. Only valid after [`Config::validate`].
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Number of turns the demo world is advanced.
    #[serde(default = "default_demo_turns")]
    pub turns: u32,
}

fn default_demo_turns() -> u32 {
    3
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            turns: default_demo_turns(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config file {}", path))?;
        Self::from_toml(&content).with_context(|| format!("parsing config file {}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(anyhow!(
                "invalid logging.level '{}' (expected one of: {})",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
        if self.store.initial_capacity == 0 {
            return Err(anyhow!("store.initial_capacity must be at least 1"));
        }
        Ok(())
    }

    /// Write a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())?;
        fs::write(path, content)
            .await
            .with_context(|| format!("writing config file {}", path))?;
        Ok(())
    }
}
