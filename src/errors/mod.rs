// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod stream;

pub use config::{ConfigError, ValidationError};
pub use stream::{panic_message, StreamError};
