// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod observer;
pub mod signal;
pub mod task;

pub use observer::{BoxObserver, FnObserver, Observer};
pub use signal::{Ack, AckResult, PendingAck, Signal};
pub use task::{FnTask, Task};
