// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::future::Future;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::errors::StreamError;
use crate::observability::messages::{stream::SchedulerShutdown, StructuredLog};

/// Executor that runs sources, drain loops and continuations.
///
/// A scheduler is passed explicitly at subscription time; nothing in the crate
/// reaches for an ambient runtime. Every subscription's cancellation token is
/// a child of the scheduler's root token, so [`Scheduler::shutdown`] stops
/// every live pipeline.
///
/// Cloning is cheap and clones share the same tracker and root token.
#[derive(Clone, Debug)]
pub struct Scheduler {
    handle: Handle,
    tracker: TaskTracker,
    root: CancellationToken,
}

impl Scheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            tracker: TaskTracker::new(),
            root: CancellationToken::new(),
        }
    }

    /// Scheduler on the runtime the caller is running in.
    pub fn current() -> Result<Self, StreamError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| StreamError::Scheduler(e.to_string()))
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn_on(future, &self.handle)
    }

    /// Fresh cancellation token for one subscription.
    pub(crate) fn subscription_token(&self) -> CancellationToken {
        self.root.child_token()
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Number of spawned tasks still running.
    pub fn active_tasks(&self) -> usize {
        self.tracker.len()
    }

    /// Cancel every subscription and wait for spawned tasks to finish.
    pub async fn shutdown(&self) {
        let started = Instant::now();
        self.root.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        SchedulerShutdown {
            duration: started.elapsed(),
        }
        .log();
    }
}

/// Handle returned from `subscribe` for cancelling a subscription early.
///
/// Dropping the handle does not cancel anything.
#[derive(Clone, Debug)]
pub struct Cancelable {
    token: CancellationToken,
}

impl Cancelable {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Ask the subscription to stop. Sources observe this before their next
    /// send; an in-flight pending signal is cancelled on a best-effort basis.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Everything a stage needs when it is subscribed.
#[derive(Clone, Debug)]
pub struct SubscriberContext {
    pub scheduler: Scheduler,
    pub token: CancellationToken,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_current_fails_outside_runtime() {
        match Scheduler::current() {
            Err(StreamError::Scheduler(_)) => {}
            other => panic!("Expected scheduler error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_subscriptions_and_waits() {
        let scheduler = Scheduler::current().expect("runtime available");
        let token = scheduler.subscription_token();
        let cancelable = Cancelable::new(token.clone());

        scheduler.spawn(async move {
            token.cancelled().await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        });
        assert_eq!(scheduler.active_tasks(), 1);

        scheduler.shutdown().await;

        assert!(scheduler.is_shut_down());
        assert!(cancelable.is_cancelled());
        assert_eq!(scheduler.active_tasks(), 0);
    }

    #[tokio::test]
    async fn test_cancelable_cancel_is_local() {
        let scheduler = Scheduler::current().expect("runtime available");
        let first = Cancelable::new(scheduler.subscription_token());
        let second = Cancelable::new(scheduler.subscription_token());

        first.cancel();

        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!scheduler.is_shut_down());
    }
}
