// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::commands::{CommandPipeline, CommandProcessor};
use crate::config::Config;

/// Builds the command runtime from configuration.
///
/// # Examples
/// ```
/// use the_sluice::config::{Config, RuntimeBuilder};
///
/// let config = Config::default();
/// let pipeline = RuntimeBuilder::from_config(&config);
/// # let _ = pipeline;
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Create a [`CommandPipeline`] whose processor, timeouts, messages and
    /// buffer all come from `cfg`.
    pub fn from_config(cfg: &Config) -> CommandPipeline {
        let processor = CommandProcessor::from_config(&cfg.commands);
        CommandPipeline::new(processor, cfg.commands.clone(), cfg.buffer.clone())
    }
}
