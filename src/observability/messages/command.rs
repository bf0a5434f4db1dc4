// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the command layer.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A command started executing.
///
/// # Log Level
/// `debug!` - Per-command detail
///
/// # Example
/// ```
/// use the_sluice::observability::messages::command::CommandStarted;
///
/// let msg = CommandStarted { command: "echo hi" };
/// assert_eq!(msg.to_string(), "Command 'echo hi' started");
/// ```
pub struct CommandStarted<'a> {
    pub command: &'a str,
}

impl Display for CommandStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Command '{}' started", self.command)
    }
}

impl StructuredLog for CommandStarted<'_> {
    fn log(&self) {
        tracing::debug!(command = self.command, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("command", span_name = name, command = self.command)
    }
}

/// A command produced its reply.
///
/// # Log Level
/// `debug!` - Per-command detail
pub struct CommandCompleted<'a> {
    pub command: &'a str,
    pub output_size: usize,
    pub duration: Duration,
}

impl Display for CommandCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Command '{}' completed: output={} bytes, duration={:?}",
            self.command, self.output_size, self.duration
        )
    }
}

impl StructuredLog for CommandCompleted<'_> {
    fn log(&self) {
        tracing::debug!(
            command = self.command,
            output_size = self.output_size,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }
}

/// A command was not recognised.
///
/// # Log Level
/// `warn!` - User input problem
pub struct CommandUnrecognized<'a> {
    pub command: &'a str,
}

impl Display for CommandUnrecognized<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Unrecognized command '{}'", self.command)
    }
}

impl StructuredLog for CommandUnrecognized<'_> {
    fn log(&self) {
        tracing::warn!(command = self.command, "{}", self);
    }
}
