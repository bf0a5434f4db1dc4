// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and operational
//! logging throughout The Sluice. Message types follow a struct-based pattern
//! with `Display` trait implementation to:
//!
//! * Eliminate magic strings scattered throughout the codebase
//! * Keep field names consistent across subsystems
//! * Provide consistent, structured logging output
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::stream` - Subscription lifecycle and source events
//! * `messages::operator` - Operator faults and timeout fallbacks
//! * `messages::buffer` - Bounded buffer overflow and drain events
//! * `messages::command` - Command execution in the example service
//!
//! # Usage
//!
//! ```rust
//! use the_sluice::observability::messages::operator::TimeoutFired;
//! use the_sluice::observability::messages::StructuredLog;
//! use std::time::Duration;
//!
//! let msg = TimeoutFired {
//!     stage: "commands",
//!     timeout: Duration::from_secs(1),
//! };
//!
//! msg.log();
//! ```

pub mod messages;
