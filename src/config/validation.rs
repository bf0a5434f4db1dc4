// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Checks a loaded [`Config`] for values the pipeline cannot run with.
//!
//! Every check runs and every problem is reported, so a user fixing a file
//! sees the full list at once rather than one error per attempt.

use crate::config::Config;
use crate::errors::ValidationError;

/// Validate `config`, collecting every problem found.
///
/// # Example
/// ```rust
/// use the_sluice::config::{validate_config, Config};
/// use the_sluice::errors::ValidationError;
///
/// let mut config = Config::default();
/// assert!(validate_config(&config).is_ok());
///
/// config.buffer.capacity = 0;
/// assert_eq!(
///     validate_config(&config).unwrap_err(),
///     vec![ValidationError::ZeroBufferCapacity]
/// );
/// ```
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.buffer.capacity == 0 {
        errors.push(ValidationError::ZeroBufferCapacity);
    }
    if config.commands.timeout_ms == 0 {
        errors.push(ValidationError::ZeroDuration { field: "timeout_ms" });
    }

    let commands = &config.commands;
    let messages = [
        ("timeout_message", &commands.timeout_message),
        ("wake_message", &commands.wake_message),
        ("error_message", &commands.error_message),
        ("finished_message", &commands.finished_message),
        ("dropped_message", &commands.dropped_message),
    ];
    for (field, text) in messages {
        if text.trim().is_empty() {
            errors.push(ValidationError::EmptyMessage { field });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
