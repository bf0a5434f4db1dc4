// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::commands::CommandProcessor;
use crate::config::consts::{DEFAULT_FLOOD_LIMIT, FLOOD_HEADROOM};
use crate::config::{BufferConfig, CommandConfig};
use crate::engine::{BufferProbe, Observable, OverflowStrategy};
use crate::errors::{StreamError, ValidationError};
use crate::operators::Notification;
use crate::traits::{FnTask, Task};

/// What the flood consumer takes out of the buffer.
#[derive(Debug, Clone)]
enum Backlog {
    Command(String),
    Dropped(u64),
}

/// Wires a [`CommandProcessor`] into the two command pipelines.
///
/// Both pipelines emit plain text, one line per reply.
#[derive(Debug, Clone)]
pub struct CommandPipeline {
    processor: Arc<CommandProcessor>,
    commands: Arc<CommandConfig>,
    buffer: BufferConfig,
}

impl CommandPipeline {
    pub fn new(processor: CommandProcessor, commands: CommandConfig, buffer: BufferConfig) -> Self {
        Self {
            processor: Arc::new(processor),
            commands: Arc::new(commands),
            buffer,
        }
    }

    /// Execute every command from `source` in order.
    ///
    /// A command that overruns the timeout is answered with the timeout
    /// message. A failure ends the stream with the error message, and a normal
    /// end with the finished message.
    pub fn process(&self, source: Observable<String>) -> Observable<String> {
        let task: Arc<dyn Task<String, String>> = self.processor.clone();
        let commands = Arc::clone(&self.commands);

        source
            .map_task_with_timeout(task, commands.timeout(), commands.timeout_message.clone())
            .materialize()
            .map(move |event| match event {
                Notification::Next(reply) => reply,
                Notification::Error(_) => commands.error_message.clone(),
                Notification::Complete => commands.finished_message.clone(),
            })
    }

    /// Replies a flood run collects by default.
    ///
    /// The drop notice follows every element already queued when overflow
    /// began, so the limit always reaches past a full buffer.
    pub fn flood_limit(&self) -> usize {
        DEFAULT_FLOOD_LIMIT.max(self.buffer.capacity.saturating_add(FLOOD_HEADROOM))
    }

    /// Repeat `commands` as fast as possible into a bounded buffer and reply to
    /// the first `limit` entries that make it through.
    ///
    /// Overflow is reported in-line with the dropped message. The returned
    /// probe exposes the buffer's counters.
    pub fn flood(
        &self,
        commands: Vec<String>,
        limit: usize,
    ) -> Result<(Observable<String>, BufferProbe), ValidationError> {
        let strategy = OverflowStrategy::from_config(&self.buffer)?
            .with_notification(|dropped| Some(Backlog::Dropped(dropped)));
        let probe = strategy.probe();

        let processor = Arc::clone(&self.processor);
        let config = Arc::clone(&self.commands);
        let consumer: Arc<dyn Task<Backlog, String>> =
            Arc::new(FnTask::new("flood_consumer", move |item: Backlog| {
                let processor = Arc::clone(&processor);
                let config = Arc::clone(&config);
                async move {
                    match item {
                        Backlog::Command(command) => processor.run(command).await,
                        Backlog::Dropped(count) => {
                            Ok::<_, StreamError>(config.dropped_notice(count))
                        }
                    }
                }
            }));

        let backlog = commands.into_iter().map(Backlog::Command).collect();
        let pipeline = Observable::unthrottled(backlog)
            .buffered(strategy)
            .map_task_with_timeout(
                consumer,
                self.commands.timeout(),
                self.commands.timeout_message.clone(),
            )
            .take(limit);
        Ok((pipeline, probe))
    }
}
