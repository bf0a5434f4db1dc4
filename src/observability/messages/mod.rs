// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for human-readable output and
//! [`StructuredLog`] to emit itself through `tracing` with typed fields at the
//! level the message is meant for.

use std::fmt::Display;
use tracing::Span;

pub mod buffer;
pub mod command;
pub mod operator;
pub mod stream;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog: Display {
    /// Emit the message as a `tracing` event.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("sluice", span_name = name)
    }
}
