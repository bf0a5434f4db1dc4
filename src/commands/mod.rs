// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! A small text-command service built on the stream core.

mod pipeline;
mod processor;

pub use pipeline::CommandPipeline;
pub use processor::CommandProcessor;
