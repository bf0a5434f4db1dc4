// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the bounded buffer between a pushy source and its consumer.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};

/// An offered element was discarded because the buffer was full.
///
/// # Log Level
/// `trace!` - Can fire thousands of times per second under overload
pub struct ElementDropped<'a> {
    pub policy: &'a str,
    pub capacity: usize,
    pub dropped_total: u64,
}

impl Display for ElementDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Buffer full (capacity={}), {} applied, {} dropped so far",
            self.capacity, self.policy, self.dropped_total
        )
    }
}

impl StructuredLog for ElementDropped<'_> {
    fn log(&self) {
        tracing::trace!(
            policy = self.policy,
            capacity = self.capacity,
            dropped_total = self.dropped_total,
            "{}", self
        );
    }
}

/// A synthetic drop-count notification was emitted downstream.
///
/// # Log Level
/// `info!` - Data loss the consumer is being told about
pub struct DropNotificationEmitted {
    pub dropped: u64,
}

impl Display for DropNotificationEmitted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Emitting drop notification for {} elements", self.dropped)
    }
}

impl StructuredLog for DropNotificationEmitted {
    fn log(&self) {
        tracing::info!(dropped = self.dropped, "{}", self);
    }
}

/// The buffer's consumer stopped; further offers are rejected.
///
/// # Log Level
/// `debug!`
pub struct DownstreamStopped<'a> {
    pub reason: &'a str,
    pub delivered: u64,
    pub discarded: usize,
}

impl Display for DownstreamStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Buffer consumer stopped after {} deliveries ({}), discarding {} queued elements",
            self.delivered, self.reason, self.discarded
        )
    }
}

impl StructuredLog for DownstreamStopped<'_> {
    fn log(&self) {
        tracing::debug!(
            reason = self.reason,
            delivered = self.delivered,
            discarded = self.discarded,
            "{}", self
        );
    }
}
