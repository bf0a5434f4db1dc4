// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Elements held by the command buffer before overflow kicks in
pub const DEFAULT_BUFFER_CAPACITY: usize = 8;
/// Deadline for a single command, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1_000;
/// How long a `sleep` command takes, in milliseconds
pub const DEFAULT_SLEEP_MS: u64 = 10_000;

pub const DEFAULT_TIMEOUT_MESSAGE: &str = "Command timed out.";
pub const DEFAULT_WAKE_MESSAGE: &str = "awake";
pub const DEFAULT_ERROR_MESSAGE: &str = "Your command could not be processed. Please try again.";
pub const DEFAULT_FINISHED_MESSAGE: &str = "No more commands to process. Shutting down!";
/// `{count}` is replaced with the number of commands lost to overflow
pub const DEFAULT_DROPPED_MESSAGE: &str = "dropped {count} commands";

/// Placeholder substituted in the dropped message
pub const COUNT_PLACEHOLDER: &str = "{count}";

/// Least number of replies collected from a `--flood` run
pub const DEFAULT_FLOOD_LIMIT: usize = 10;

/// Replies collected beyond a full buffer, enough to reach its drop notice
pub const FLOOD_HEADROOM: usize = 4;
