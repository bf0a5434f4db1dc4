// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Problems found while validating a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A bounded buffer needs room for at least one element
    #[error("buffer capacity must be greater than zero")]
    ZeroBufferCapacity,

    /// A duration that bounds work was configured as zero
    #[error("'{field}' must be greater than zero")]
    ZeroDuration { field: &'static str },

    /// A user-facing message literal was left empty
    #[error("'{field}' must not be empty")]
    EmptyMessage { field: &'static str },
}

/// Errors raised while loading configuration from disk.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration validation failed:\n{}", join_lines(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_lines(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
