// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The backpressure vocabulary exchanged at every stage boundary.
//!
//! An observer answers each element with a [`Signal`]. A `Ready` signal is
//! already resolved and the caller may act on it immediately. A `Pending`
//! signal resolves later, and the caller must not deliver another element
//! until it has.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

use crate::errors::StreamError;

/// Downstream's answer to one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Send the next element.
    Continue,
    /// Cease sending; the subscription is closed.
    Stop,
}

/// A resolved signal: an [`Ack`], or the error that terminates the subscription.
pub type AckResult = Result<Ack, StreamError>;

/// An acknowledgement that resolves asynchronously.
///
/// Carries a cancellation token when the work behind it can be abandoned
/// early. Dropping a `PendingAck` also abandons it.
pub struct PendingAck {
    future: BoxFuture<'static, AckResult>,
    cancel: Option<CancellationToken>,
}

impl PendingAck {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = AckResult> + Send + 'static,
    {
        Self {
            future: Box::pin(future),
            cancel: None,
        }
    }

    /// A pending ack whose work observes `token` and gives up when it fires.
    pub fn cancellable<F>(future: F, token: CancellationToken) -> Self
    where
        F: Future<Output = AckResult> + Send + 'static,
    {
        Self {
            future: Box::pin(future),
            cancel: Some(token),
        }
    }

    pub fn is_cancellable(&self) -> bool {
        self.cancel.is_some()
    }

    /// Request cancellation. A no-op for non-cancellable acks; never fails.
    pub fn cancel(&self) {
        if let Some(token) = &self.cancel {
            token.cancel();
        }
    }

    /// Replace the outcome with `f(outcome)` once this ack resolves.
    /// Cancellability is kept.
    pub fn map<M>(self, f: M) -> Self
    where
        M: FnOnce(AckResult) -> AckResult + Send + 'static,
    {
        let PendingAck { future, cancel } = self;
        Self {
            future: Box::pin(async move { f(future.await) }),
            cancel,
        }
    }

    /// Run `hook` with the outcome once this ack resolves.
    pub fn inspect<H>(self, hook: H) -> Self
    where
        H: FnOnce(&AckResult) + Send + 'static,
    {
        self.map(move |result| {
            hook(&result);
            result
        })
    }
}

impl Future for PendingAck {
    type Output = AckResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}

impl fmt::Debug for PendingAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAck")
            .field("cancellable", &self.is_cancellable())
            .finish()
    }
}

/// The value returned from [`Observer::on_next`](crate::traits::Observer::on_next).
#[derive(Debug)]
pub enum Signal {
    /// Resolved synchronously.
    Ready(AckResult),
    /// Resolves later; the caller waits before sending again.
    Pending(PendingAck),
}

impl Signal {
    pub const CONTINUE: Signal = Signal::Ready(Ok(Ack::Continue));
    pub const STOP: Signal = Signal::Ready(Ok(Ack::Stop));

    pub fn fail(error: StreamError) -> Self {
        Signal::Ready(Err(error))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = AckResult> + Send + 'static,
    {
        Signal::Pending(PendingAck::new(future))
    }

    pub fn is_synchronous(&self) -> bool {
        matches!(self, Signal::Ready(_))
    }

    pub fn is_cancellable(&self) -> bool {
        match self {
            Signal::Ready(_) => false,
            Signal::Pending(pending) => pending.is_cancellable(),
        }
    }

    pub async fn resolve(self) -> AckResult {
        match self {
            Signal::Ready(result) => result,
            Signal::Pending(pending) => pending.await,
        }
    }

    /// Resolve unless `token` fires first.
    ///
    /// Returns `None` when the subscription was cancelled; a cancellable pending
    /// ack is told to give up before it is dropped.
    pub async fn resolve_or_cancel(self, token: &CancellationToken) -> Option<AckResult> {
        match self {
            Signal::Ready(result) => Some(result),
            Signal::Pending(mut pending) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        pending.cancel();
                        None
                    }
                    result = &mut pending => Some(result),
                }
            }
        }
    }
}

impl From<Ack> for Signal {
    fn from(ack: Ack) -> Self {
        Signal::Ready(Ok(ack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_ready_signal_resolves_immediately() {
        assert!(Signal::CONTINUE.is_synchronous());
        assert_eq!(Signal::CONTINUE.resolve().await, Ok(Ack::Continue));
        assert_eq!(Signal::from(Ack::Stop).resolve().await, Ok(Ack::Stop));

        let failed = Signal::fail(StreamError::Abandoned).resolve().await;
        assert_eq!(failed, Err(StreamError::Abandoned));
    }

    #[tokio::test]
    async fn test_pending_signal_resolves_later() {
        let signal = Signal::pending(async {
            tokio::task::yield_now().await;
            Ok(Ack::Continue)
        });
        assert!(!signal.is_synchronous());
        assert!(!signal.is_cancellable());
        assert_eq!(signal.resolve().await, Ok(Ack::Continue));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_or_cancel_cancels_pending_work() {
        let work_token = CancellationToken::new();
        let observed = work_token.clone();
        let signal = Signal::Pending(PendingAck::cancellable(
            async move {
                observed.cancelled().await;
                Ok(Ack::Stop)
            },
            work_token.clone(),
        ));
        assert!(signal.is_cancellable());

        let subscription = CancellationToken::new();
        let trigger = subscription.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });

        assert_eq!(signal.resolve_or_cancel(&subscription).await, None);
        assert!(work_token.is_cancelled());
    }

    #[tokio::test]
    async fn test_map_keeps_cancellability() {
        let token = CancellationToken::new();
        let pending = PendingAck::cancellable(async { Ok(Ack::Continue) }, token.clone())
            .map(|_| Ok(Ack::Stop));
        assert!(pending.is_cancellable());
        assert_eq!(pending.await, Ok(Ack::Stop));
    }

    #[tokio::test]
    async fn test_inspect_sees_outcome() {
        let seen = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&seen);
        let pending = PendingAck::new(async { Ok(Ack::Continue) }).inspect(move |result| {
            flag.store(matches!(result, Ok(Ack::Continue)), Ordering::SeqCst);
        });

        assert_eq!(pending.await, Ok(Ack::Continue));
        assert!(seen.load(Ordering::SeqCst));
    }
}
