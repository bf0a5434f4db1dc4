// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for operator stages.

use crate::errors::StreamError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// An element failed inside a stage and the subscription is terminating.
///
/// # Log Level
/// `error!` - The pipeline lost its subscription
///
/// # Example
/// ```
/// use the_sluice::errors::StreamError;
/// use the_sluice::observability::messages::operator::ElementFaulted;
///
/// let error = StreamError::element_fault("map", "bad input");
/// let msg = ElementFaulted {
///     stage: "map",
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct ElementFaulted<'a> {
    pub stage: &'a str,
    pub error: &'a StreamError,
}

impl Display for ElementFaulted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Stage '{}' failed: {}", self.stage, self.error)
    }
}

impl StructuredLog for ElementFaulted<'_> {
    fn log(&self) {
        tracing::error!(stage = self.stage, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("element_fault", span_name = name, stage = self.stage)
    }
}

/// A per-element task lost its race against the deadline and the fallback was used.
///
/// # Log Level
/// `warn!` - Recovered locally, but worth noticing
pub struct TimeoutFired<'a> {
    pub stage: &'a str,
    pub timeout: Duration,
}

impl Display for TimeoutFired<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage '{}' timed out after {:?}, forwarding fallback",
            self.stage, self.timeout
        )
    }
}

impl StructuredLog for TimeoutFired<'_> {
    fn log(&self) {
        tracing::warn!(
            stage = self.stage,
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", self
        );
    }
}

/// A task finished inside its deadline.
///
/// # Log Level
/// `trace!` - Hot path
pub struct TaskCompleted<'a> {
    pub stage: &'a str,
    pub duration: Duration,
}

impl Display for TaskCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Stage '{}' task completed in {:?}", self.stage, self.duration)
    }
}

impl StructuredLog for TaskCompleted<'_> {
    fn log(&self) {
        tracing::trace!(
            stage = self.stage,
            duration_us = self.duration.as_micros() as u64,
            "{}", self
        );
    }
}
