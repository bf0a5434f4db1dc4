// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod commands;      // example command service
pub mod config;        // yaml config + runtime builder
pub mod engine;        // observables, scheduler, buffering
pub mod errors;        // error handling
pub mod observability;
pub mod operators;     // pipeline stages
pub mod traits;        // observer protocol + tasks
