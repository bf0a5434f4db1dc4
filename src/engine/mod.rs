// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observables, the scheduler that drives them, and the buffering stage.

pub mod buffered;
pub mod observable;
pub(crate) mod safe_observer;
pub mod scheduler;
pub(crate) mod shared;
pub mod unthrottled;

pub use buffered::{
    BufferProbe, BufferSnapshot, BufferedSubscriber, DropNotifier, DropPolicy, Offer,
    OverflowStrategy,
};
pub use observable::Observable;
pub use scheduler::{Cancelable, Scheduler, SubscriberContext};
