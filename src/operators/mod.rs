// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pipeline stages. Each one is an `impl Observable` block adding a
//! combinator; the stage types themselves stay private.

mod map;
mod materialize;
mod take;
mod timeout;

pub use materialize::Notification;
