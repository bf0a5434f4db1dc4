// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for subscription lifecycle and source events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A source started producing for a new subscription.
///
/// # Log Level
/// `debug!` - Per-subscription event
pub struct SubscriptionStarted<'a> {
    pub source: &'a str,
}

impl Display for SubscriptionStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Subscription started on '{}' source", self.source)
    }
}

impl StructuredLog for SubscriptionStarted<'_> {
    fn log(&self) {
        tracing::debug!(source = self.source, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("subscription", span_name = name, source = self.source)
    }
}

/// A source noticed its subscription was cancelled and stopped producing.
///
/// # Log Level
/// `debug!` - Expected shutdown path
pub struct SubscriptionCancelled<'a> {
    pub source: &'a str,
    pub emitted: u64,
}

impl Display for SubscriptionCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Subscription on '{}' source cancelled after {} elements",
            self.source, self.emitted
        )
    }
}

impl StructuredLog for SubscriptionCancelled<'_> {
    fn log(&self) {
        tracing::debug!(source = self.source, emitted = self.emitted, "{}", self);
    }
}

/// A source ran to exhaustion.
///
/// # Log Level
/// `debug!`
pub struct SourceExhausted<'a> {
    pub source: &'a str,
    pub emitted: u64,
}

impl Display for SourceExhausted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Source '{}' exhausted after {} elements",
            self.source, self.emitted
        )
    }
}

impl StructuredLog for SourceExhausted<'_> {
    fn log(&self) {
        tracing::debug!(source = self.source, emitted = self.emitted, "{}", self);
    }
}

/// A source stopped because its downstream answered `Stop` or failed.
///
/// # Log Level
/// `debug!`
pub struct SourceStopped<'a> {
    pub source: &'a str,
    pub emitted: u64,
    pub reason: &'a str,
}

impl Display for SourceStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Source '{}' stopped after {} elements: {}",
            self.source, self.emitted, self.reason
        )
    }
}

impl StructuredLog for SourceStopped<'_> {
    fn log(&self) {
        tracing::debug!(
            source = self.source,
            emitted = self.emitted,
            reason = self.reason,
            "{}", self
        );
    }
}

/// A scheduler was shut down, cancelling every live subscription.
///
/// # Log Level
/// `info!` - Lifecycle event
pub struct SchedulerShutdown {
    pub duration: std::time::Duration,
}

impl Display for SchedulerShutdown {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Scheduler shut down in {:?}", self.duration)
    }
}

impl StructuredLog for SchedulerShutdown {
    fn log(&self) {
        tracing::info!(duration_ms = self.duration.as_millis() as u64, "{}", self);
    }
}

/// An upstream broke the sequential-delivery contract.
///
/// # Log Level
/// `error!` - A bug in the calling stage
pub struct ProtocolViolated<'a> {
    pub stage: &'a str,
    pub detail: &'a str,
}

impl Display for ProtocolViolated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Observer contract violated at '{}': {}", self.stage, self.detail)
    }
}

impl StructuredLog for ProtocolViolated<'_> {
    fn log(&self) {
        tracing::error!(stage = self.stage, detail = self.detail, "{}", self);
    }
}
