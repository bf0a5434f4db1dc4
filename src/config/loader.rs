// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::consts::{
    COUNT_PLACEHOLDER, DEFAULT_BUFFER_CAPACITY, DEFAULT_DROPPED_MESSAGE, DEFAULT_ERROR_MESSAGE,
    DEFAULT_FINISHED_MESSAGE, DEFAULT_SLEEP_MS, DEFAULT_TIMEOUT_MESSAGE, DEFAULT_TIMEOUT_MS,
    DEFAULT_WAKE_MESSAGE,
};
use crate::engine::DropPolicy;
use crate::errors::ConfigError;

/// Top-level configuration, typically loaded from a YAML file.
///
/// Every field is optional; an empty document yields the defaults in
/// [`consts`](crate::config::consts).
///
/// # Example
/// ```yaml
/// buffer:
///   capacity: 8
///   policy: drop_newest
/// commands:
///   timeout_ms: 1000
///   sleep_ms: 10000
///   timeout_message: "Command timed out."
///   dropped_message: "dropped {count} commands"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub commands: CommandConfig,
}

/// Settings for the bounded buffer placed after an unthrottled source.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BufferConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default)]
    pub policy: DropPolicy,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_BUFFER_CAPACITY,
            policy: DropPolicy::default(),
        }
    }
}

/// Timings and user-facing text of the command pipeline.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    pub timeout_ms: u64,
    pub sleep_ms: u64,
    pub timeout_message: String,
    pub wake_message: String,
    pub error_message: String,
    pub finished_message: String,
    pub dropped_message: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            sleep_ms: DEFAULT_SLEEP_MS,
            timeout_message: DEFAULT_TIMEOUT_MESSAGE.to_string(),
            wake_message: DEFAULT_WAKE_MESSAGE.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            finished_message: DEFAULT_FINISHED_MESSAGE.to_string(),
            dropped_message: DEFAULT_DROPPED_MESSAGE.to_string(),
        }
    }
}

impl CommandConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn sleep(&self) -> Duration {
        Duration::from_millis(self.sleep_ms)
    }

    /// The dropped message with its `{count}` placeholder filled in.
    pub fn dropped_notice(&self, count: u64) -> String {
        self.dropped_message
            .replace(COUNT_PLACEHOLDER, &count.to_string())
    }
}

fn default_capacity() -> usize {
    DEFAULT_BUFFER_CAPACITY
}

/// Load a config from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = serde_yaml::from_str(&content)?;
    Ok(cfg)
}

/// Load a config from a YAML file and reject values the pipeline cannot run with.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}
