// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::Instrument;

use crate::config::CommandConfig;
use crate::errors::StreamError;
use crate::observability::messages::command::{
    CommandCompleted, CommandStarted, CommandUnrecognized,
};
use crate::observability::messages::StructuredLog;
use crate::traits::Task;

/// Executes one text command and answers with its reply.
///
/// * `echo…` replies with the command itself
/// * `sleep…` waits, then replies with the wake message
/// * anything else replies `Invalid command <cmd> provided.`
///
/// Unknown commands are a reply, not a failure.
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    sleep: Duration,
    wake_message: String,
}

impl CommandProcessor {
    pub fn new(sleep: Duration, wake_message: impl Into<String>) -> Self {
        Self {
            sleep,
            wake_message: wake_message.into(),
        }
    }

    pub fn from_config(config: &CommandConfig) -> Self {
        Self::new(config.sleep(), config.wake_message.clone())
    }

    async fn execute(&self, command: &str) -> String {
        if command.starts_with("echo") {
            command.to_string()
        } else if command.starts_with("sleep") {
            tokio::time::sleep(self.sleep).await;
            self.wake_message.clone()
        } else {
            CommandUnrecognized { command }.log();
            format!("Invalid command {} provided.", command)
        }
    }
}

#[async_trait]
impl Task<String, String> for CommandProcessor {
    async fn run(&self, command: String) -> Result<String, StreamError> {
        let start_msg = CommandStarted { command: &command };
        let span = start_msg.span("command_execution");
        span.in_scope(|| start_msg.log());

        let started = Instant::now();
        let reply = self.execute(&command).instrument(span).await;

        CommandCompleted {
            command: &command,
            output_size: reply.len(),
            duration: started.elapsed(),
        }
        .log();
        Ok(reply)
    }

    fn name(&self) -> &str {
        "command_processor"
    }
}
