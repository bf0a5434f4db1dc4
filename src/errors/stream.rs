// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors that travel through a pipeline as terminal signals.

use std::any::Any;
use thiserror::Error;

/// Terminal failure of a subscription.
///
/// Timeouts and buffer overflow are recovered locally by their stages and never
/// show up here. Everything in this enum ends the subscription it occurs in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// A transformation or per-element task failed (returned an error or panicked).
    #[error("element processing failed in '{stage}': {message}")]
    ElementFault { stage: String, message: String },

    /// A caller broke the observer contract, e.g. issued `on_next` while the
    /// previous signal was still pending.
    #[error("observer contract violated at '{stage}': {detail}")]
    ProtocolViolation { stage: String, detail: String },

    /// The scheduler could not run or finish a task.
    #[error("scheduler failure: {0}")]
    Scheduler(String),

    /// The subscription went away without delivering a terminal event,
    /// usually because it was cancelled.
    #[error("subscription ended without a terminal event")]
    Abandoned,
}

impl StreamError {
    pub fn element_fault(stage: impl Into<String>, message: impl Into<String>) -> Self {
        StreamError::ElementFault {
            stage: stage.into(),
            message: message.into(),
        }
    }

    pub fn protocol_violation(stage: impl Into<String>, detail: impl Into<String>) -> Self {
        StreamError::ProtocolViolation {
            stage: stage.into(),
            detail: detail.into(),
        }
    }
}

/// Best-effort text for a caught panic payload.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_fault_display() {
        let err = StreamError::element_fault("map", "division by zero");
        assert_eq!(
            err.to_string(),
            "element processing failed in 'map': division by zero"
        );
    }

    #[test]
    fn test_panic_message_variants() {
        let static_payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(static_payload), "boom");

        let owned_payload: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(owned_payload), "kaboom");

        let other_payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(other_payload), "panic with a non-string payload");
    }
}
