// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded decoupling buffer between a producer that cannot be slowed down and
//! a consumer that answers at its own pace.
//!
//! ## Shape
//!
//! ```text
//!   producer ──on_next──► BufferedSubscriber ──offer──► [ bounded queue ]
//!      ▲                        │ (always answers immediately)    │
//!      └──── Continue / Stop ───┘                                 ▼
//!                                                         drain task ──on_next──► downstream
//!                                                         (one delivery in flight)
//! ```
//!
//! The producer never waits: every offer is answered synchronously. A single
//! drain task owns the downstream observer and delivers strictly one element
//! at a time, oldest first. When the queue is full the [`DropPolicy`] decides
//! what is lost, and an optional notifier turns the number of lost elements
//! into a synthetic element. The notice is delivered right after the elements
//! that were already queued when the drops began, ahead of anything accepted
//! later, and it never takes up capacity.

use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::config::BufferConfig;
use crate::engine::observable::Observable;
use crate::engine::scheduler::SubscriberContext;
use crate::errors::{StreamError, ValidationError};
use crate::observability::messages::buffer::{
    DownstreamStopped, DropNotificationEmitted, ElementDropped,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{Ack, BoxObserver, Observer, Signal};

/// What a full buffer gives up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Discard the element being offered; queued work wins.
    #[default]
    DropNewest,
    /// Evict the oldest queued element to make room.
    DropOldest,
}

impl DropPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropPolicy::DropNewest => "drop_newest",
            DropPolicy::DropOldest => "drop_oldest",
        }
    }
}

/// Builds the synthetic element describing how many elements were lost.
pub type DropNotifier<T> = Arc<dyn Fn(u64) -> Option<T> + Send + Sync>;

/// Configuration of a bounded buffer at capacity.
pub struct OverflowStrategy<T> {
    capacity: NonZeroUsize,
    policy: DropPolicy,
    notifier: Option<DropNotifier<T>>,
    probe: BufferProbe,
}

impl<T> OverflowStrategy<T> {
    pub fn new(capacity: NonZeroUsize, policy: DropPolicy) -> Self {
        Self {
            capacity,
            policy,
            notifier: None,
            probe: BufferProbe::default(),
        }
    }

    pub fn drop_newest(capacity: NonZeroUsize) -> Self {
        Self::new(capacity, DropPolicy::DropNewest)
    }

    pub fn drop_oldest(capacity: NonZeroUsize) -> Self {
        Self::new(capacity, DropPolicy::DropOldest)
    }

    pub fn from_config(config: &BufferConfig) -> Result<Self, ValidationError> {
        let capacity =
            NonZeroUsize::new(config.capacity).ok_or(ValidationError::ZeroBufferCapacity)?;
        Ok(Self::new(capacity, config.policy))
    }

    /// Emit `notifier(count)` downstream, when it returns `Some`, to report
    /// `count` consecutive drops.
    pub fn with_notification<F>(mut self, notifier: F) -> Self
    where
        F: Fn(u64) -> Option<T> + Send + Sync + 'static,
    {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn policy(&self) -> DropPolicy {
        self.policy
    }

    /// Live counters of the buffer this strategy will configure.
    pub fn probe(&self) -> BufferProbe {
        self.probe.clone()
    }
}

impl<T> Clone for OverflowStrategy<T> {
    fn clone(&self) -> Self {
        Self {
            capacity: self.capacity,
            policy: self.policy,
            notifier: self.notifier.clone(),
            probe: self.probe.clone(),
        }
    }
}

impl<T> fmt::Debug for OverflowStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverflowStrategy")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
struct BufferCounters {
    offered: AtomicU64,
    accepted: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
    delivered: AtomicU64,
    notifications: AtomicU64,
    depth: AtomicUsize,
    delivering: AtomicBool,
}

/// Read-only view of a buffer's counters, safe to poll from any thread.
#[derive(Debug, Clone, Default)]
pub struct BufferProbe {
    counters: Arc<BufferCounters>,
}

/// Point-in-time copy of a buffer's counters.
///
/// * `accepted` counts offers that found room in the queue
/// * `dropped` counts offers that found the queue full; under drop-oldest the
///   offered element still enters the queue and the oldest one is lost instead
/// * `rejected` counts offers refused after the consumer stopped
///
/// `offered == accepted + dropped + rejected` under either policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferSnapshot {
    pub offered: u64,
    pub accepted: u64,
    pub dropped: u64,
    pub rejected: u64,
    pub delivered: u64,
    pub notifications: u64,
    pub depth: usize,
    pub delivering: bool,
}

impl BufferProbe {
    pub fn snapshot(&self) -> BufferSnapshot {
        let c = &self.counters;
        BufferSnapshot {
            offered: c.offered.load(Ordering::Acquire),
            accepted: c.accepted.load(Ordering::Acquire),
            dropped: c.dropped.load(Ordering::Acquire),
            rejected: c.rejected.load(Ordering::Acquire),
            delivered: c.delivered.load(Ordering::Acquire),
            notifications: c.notifications.load(Ordering::Acquire),
            depth: c.depth.load(Ordering::Acquire),
            delivering: c.delivering.load(Ordering::Acquire),
        }
    }
}

/// Result of offering one element to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    Dropped,
    Rejected,
}

enum Terminal {
    Complete,
    Error(StreamError),
}

/// Drops not yet reported, and how many queued elements precede the report.
#[derive(Debug, Clone, Copy)]
struct DropNotice {
    count: u64,
    ahead: usize,
}

struct BufferState<T> {
    queue: VecDeque<T>,
    notice: Option<DropNotice>,
    terminal: Option<Terminal>,
    downstream_done: bool,
}

struct Shared<T> {
    state: Mutex<BufferState<T>>,
    wakeup: Notify,
    capacity: usize,
    policy: DropPolicy,
    reports_drops: bool,
    probe: BufferProbe,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, BufferState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn counters(&self) -> &BufferCounters {
        &self.probe.counters
    }

    /// Mark the consumer as gone and discard whatever is still queued.
    fn close(&self, reason: &str) {
        let discarded = {
            let mut state = self.lock();
            state.downstream_done = true;
            state.terminal = None;
            state.notice = None;
            let discarded = state.queue.len();
            state.queue.clear();
            discarded
        };
        self.counters().depth.store(0, Ordering::Release);
        DownstreamStopped {
            reason,
            delivered: self.counters().delivered.load(Ordering::Acquire),
            discarded,
        }
        .log();
    }
}

enum Delivery<T> {
    Element(T),
    Complete,
    Error(StreamError),
    Idle,
}

/// Upstream-facing side of the buffer. See the module docs.
pub struct BufferedSubscriber<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> BufferedSubscriber<T> {
    /// Create the buffer and spawn its drain task on `ctx.scheduler`. The drain
    /// task stops when `ctx.token` is cancelled.
    pub fn new(
        downstream: BoxObserver<T>,
        strategy: OverflowStrategy<T>,
        ctx: &SubscriberContext,
    ) -> Self {
        let OverflowStrategy {
            capacity,
            policy,
            notifier,
            probe,
        } = strategy;
        let shared = Arc::new(Shared {
            state: Mutex::new(BufferState {
                queue: VecDeque::with_capacity(capacity.get()),
                notice: None,
                terminal: None,
                downstream_done: false,
            }),
            wakeup: Notify::new(),
            capacity: capacity.get(),
            policy,
            reports_drops: notifier.is_some(),
            probe,
        });
        ctx.scheduler.spawn(drain(
            Arc::clone(&shared),
            downstream,
            notifier,
            ctx.token.clone(),
        ));
        Self { shared }
    }

    /// Enqueue without waiting. Never blocks, whatever the drain task is doing.
    pub fn offer(&self, elem: T) -> Offer {
        let shared = &self.shared;
        let counters = shared.counters();
        counters.offered.fetch_add(1, Ordering::AcqRel);

        let mut state = shared.lock();
        if state.downstream_done {
            counters.rejected.fetch_add(1, Ordering::AcqRel);
            return Offer::Rejected;
        }

        if state.queue.len() < shared.capacity {
            state.queue.push_back(elem);
            counters.accepted.fetch_add(1, Ordering::AcqRel);
            counters.depth.store(state.queue.len(), Ordering::Release);
            drop(state);
            shared.wakeup.notify_one();
            return Offer::Accepted;
        }

        if shared.reports_drops {
            let ahead = state.queue.len();
            let notice = state.notice.get_or_insert(DropNotice { count: 0, ahead });
            notice.count += 1;
        }
        let dropped_total = counters.dropped.fetch_add(1, Ordering::AcqRel) + 1;
        let offer = match shared.policy {
            DropPolicy::DropNewest => Offer::Dropped,
            DropPolicy::DropOldest => {
                state.queue.pop_front();
                passed_one(&mut state.notice);
                state.queue.push_back(elem);
                Offer::Accepted
            }
        };
        drop(state);

        ElementDropped {
            policy: shared.policy.as_str(),
            capacity: shared.capacity,
            dropped_total,
        }
        .log();
        offer
    }

    fn finish(&self, terminal: Terminal) {
        {
            let mut state = self.shared.lock();
            if state.downstream_done || state.terminal.is_some() {
                return;
            }
            state.terminal = Some(terminal);
        }
        self.shared.wakeup.notify_one();
    }
}

impl<T: Send + 'static> Observer<T> for BufferedSubscriber<T> {
    fn on_next(&mut self, elem: T) -> Signal {
        match self.offer(elem) {
            Offer::Rejected => Signal::STOP,
            Offer::Accepted | Offer::Dropped => Signal::CONTINUE,
        }
    }

    fn on_complete(&mut self) {
        self.finish(Terminal::Complete);
    }

    fn on_error(&mut self, error: StreamError) {
        self.finish(Terminal::Error(error));
    }
}

/// An element left the front of the queue.
fn passed_one(notice: &mut Option<DropNotice>) {
    if let Some(notice) = notice {
        notice.ahead = notice.ahead.saturating_sub(1);
    }
}

fn next_delivery<T>(shared: &Shared<T>, notifier: Option<&DropNotifier<T>>) -> Delivery<T> {
    loop {
        let mut state = shared.lock();

        if state.notice.is_some_and(|notice| notice.ahead == 0) {
            let dropped = state.notice.take().map_or(0, |notice| notice.count);
            drop(state);
            if let Some(notice) = notifier.and_then(|notifier| notifier(dropped)) {
                shared.counters().notifications.fetch_add(1, Ordering::AcqRel);
                DropNotificationEmitted { dropped }.log();
                return Delivery::Element(notice);
            }
            continue;
        }

        if let Some(elem) = state.queue.pop_front() {
            passed_one(&mut state.notice);
            shared
                .counters()
                .depth
                .store(state.queue.len(), Ordering::Release);
            return Delivery::Element(elem);
        }
        return match state.terminal.take() {
            Some(Terminal::Complete) => Delivery::Complete,
            Some(Terminal::Error(error)) => Delivery::Error(error),
            None => Delivery::Idle,
        };
    }
}

/// Sole owner of the downstream. Idle while the queue is empty, delivering
/// while one element's signal is unresolved.
async fn drain<T: Send + 'static>(
    shared: Arc<Shared<T>>,
    mut downstream: BoxObserver<T>,
    notifier: Option<DropNotifier<T>>,
    token: CancellationToken,
) {
    loop {
        match next_delivery(&shared, notifier.as_ref()) {
            Delivery::Element(elem) => {
                let counters = shared.counters();
                counters.delivering.store(true, Ordering::Release);
                let outcome = downstream.on_next(elem).resolve_or_cancel(&token).await;
                counters.delivering.store(false, Ordering::Release);

                match outcome {
                    None => return,
                    Some(Ok(Ack::Continue)) => {
                        counters.delivered.fetch_add(1, Ordering::AcqRel);
                    }
                    Some(Ok(Ack::Stop)) => {
                        counters.delivered.fetch_add(1, Ordering::AcqRel);
                        shared.close("downstream stopped");
                        return;
                    }
                    Some(Err(error)) => {
                        shared.close("downstream failed");
                        downstream.on_error(error);
                        return;
                    }
                }
            }
            Delivery::Complete => {
                shared.close("upstream completed");
                downstream.on_complete();
                return;
            }
            Delivery::Error(error) => {
                shared.close("upstream failed");
                downstream.on_error(error);
                return;
            }
            Delivery::Idle => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = shared.wakeup.notified() => {}
                }
            }
        }
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Insert a bounded buffer below this observable.
    ///
    /// The upstream is answered immediately on every element, so this is the
    /// stage to put directly after a source that ignores backpressure.
    pub fn buffered(self, strategy: OverflowStrategy<T>) -> Observable<T> {
        Observable::named("buffered", move |downstream, ctx| {
            let buffer = BufferedSubscriber::new(downstream, strategy, &ctx);
            self.subscribe_with(Box::new(buffer), ctx);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scheduler::Scheduler;
    use crate::traits::FnObserver;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn context(scheduler: &Scheduler) -> SubscriberContext {
        SubscriberContext {
            scheduler: scheduler.clone(),
            token: scheduler.subscription_token(),
        }
    }

    /// Downstream that reports every element and terminal on a channel.
    fn channel_observer<T: Send + 'static>(
        tx: mpsc::UnboundedSender<Result<Option<T>, StreamError>>,
    ) -> BoxObserver<T> {
        let (next_tx, error_tx, complete_tx) = (tx.clone(), tx.clone(), tx);
        Box::new(FnObserver::new(
            move |elem: T| {
                let _ = next_tx.send(Ok(Some(elem)));
                Signal::CONTINUE
            },
            move |error| {
                let _ = error_tx.send(Err(error));
            },
            move || {
                let _ = complete_tx.send(Ok(None));
            },
        ))
    }

    async fn collect<T>(
        rx: &mut mpsc::UnboundedReceiver<Result<Option<T>, StreamError>>,
    ) -> (Vec<T>, Option<Result<(), StreamError>>) {
        let mut items = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                Ok(Some(item)) => items.push(item),
                Ok(None) => return (items, Some(Ok(()))),
                Err(error) => return (items, Some(Err(error))),
            }
        }
        (items, None)
    }

    #[tokio::test]
    async fn test_drop_newest_keeps_earliest_offers() {
        let scheduler = Scheduler::current().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let strategy = OverflowStrategy::drop_newest(capacity(4));
        let probe = strategy.probe();
        let mut buffer = BufferedSubscriber::new(channel_observer(tx), strategy, &context(&scheduler));

        // No await between offers: the drain task cannot run.
        for value in 0..10u32 {
            assert!(buffer.on_next(value).is_synchronous());
        }
        buffer.on_complete();

        let snapshot = probe.snapshot();
        assert_eq!(snapshot.accepted, 4);
        assert_eq!(snapshot.dropped, 6);
        assert_eq!(snapshot.offered, snapshot.accepted + snapshot.dropped + snapshot.rejected);

        let (items, terminal) = collect(&mut rx).await;
        assert_eq!(items, vec![0, 1, 2, 3]);
        assert_eq!(terminal, Some(Ok(())));
    }

    #[tokio::test]
    async fn test_drop_oldest_keeps_latest_offers() {
        let scheduler = Scheduler::current().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let strategy = OverflowStrategy::drop_oldest(capacity(3));
        let probe = strategy.probe();
        let mut buffer = BufferedSubscriber::new(channel_observer(tx), strategy, &context(&scheduler));

        for value in 0..7u32 {
            buffer.on_next(value);
        }
        buffer.on_complete();

        let (items, _) = collect(&mut rx).await;
        assert_eq!(items, vec![4, 5, 6]);
        let snapshot = probe.snapshot();
        assert_eq!(snapshot.dropped, 4);
        assert_eq!(snapshot.offered, snapshot.accepted + snapshot.dropped + snapshot.rejected);
    }

    #[tokio::test]
    async fn test_notification_follows_elements_queued_before_drops() {
        let scheduler = Scheduler::current().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let strategy = OverflowStrategy::drop_newest(capacity(2))
            .with_notification(|dropped| Some(format!("dropped {}", dropped)));
        let probe = strategy.probe();
        let mut buffer = BufferedSubscriber::new(channel_observer(tx), strategy, &context(&scheduler));

        for value in ["a", "b", "c", "d", "e"] {
            buffer.on_next(value.to_string());
        }
        buffer.on_complete();

        let (items, terminal) = collect(&mut rx).await;
        assert_eq!(items, vec!["a", "b", "dropped 3"]);
        assert_eq!(terminal, Some(Ok(())));
        assert_eq!(probe.snapshot().notifications, 1);
    }

    #[tokio::test]
    async fn test_drop_oldest_notice_precedes_survivors() {
        let scheduler = Scheduler::current().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let strategy = OverflowStrategy::drop_oldest(capacity(2))
            .with_notification(|dropped| Some(format!("lost {}", dropped)));
        let mut buffer = BufferedSubscriber::new(channel_observer(tx), strategy, &context(&scheduler));

        for value in ["a", "b", "c", "d"] {
            buffer.on_next(value.to_string());
        }
        buffer.on_complete();

        let (items, _) = collect(&mut rx).await;
        assert_eq!(items, vec!["lost 2", "c", "d"]);
    }

    #[tokio::test]
    async fn test_notifier_returning_none_is_skipped() {
        let scheduler = Scheduler::current().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let strategy = OverflowStrategy::drop_newest(capacity(1)).with_notification(|_| None);
        let mut buffer = BufferedSubscriber::new(channel_observer(tx), strategy, &context(&scheduler));

        for value in 0..3u8 {
            buffer.on_next(value);
        }
        buffer.on_complete();

        let (items, _) = collect(&mut rx).await;
        assert_eq!(items, vec![0]);
    }

    #[tokio::test]
    async fn test_upstream_error_delivered_after_queued_elements() {
        let scheduler = Scheduler::current().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut buffer = BufferedSubscriber::new(
            channel_observer(tx),
            OverflowStrategy::drop_newest(capacity(8)),
            &context(&scheduler),
        );

        buffer.on_next(1u8);
        buffer.on_next(2u8);
        buffer.on_error(StreamError::element_fault("source", "lost connection"));
        buffer.on_complete();

        let (items, terminal) = collect(&mut rx).await;
        assert_eq!(items, vec![1, 2]);
        assert_eq!(
            terminal,
            Some(Err(StreamError::element_fault("source", "lost connection")))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_rejects_further_offers_and_delivers_one_at_a_time() {
        let scheduler = Scheduler::current().unwrap();
        let in_flight = Arc::new(AtomicBool::new(false));
        let overlapped = Arc::new(AtomicBool::new(false));
        let seen = Arc::new(AtomicUsize::new(0));

        let (flag, overlap, count) = (
            Arc::clone(&in_flight),
            Arc::clone(&overlapped),
            Arc::clone(&seen),
        );
        let downstream: BoxObserver<u32> = Box::new(FnObserver::new(
            move |_elem: u32| {
                if flag.swap(true, Ordering::SeqCst) {
                    overlap.store(true, Ordering::SeqCst);
                }
                let n = count.fetch_add(1, Ordering::SeqCst) + 1;
                let flag = Arc::clone(&flag);
                Signal::pending(async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    flag.store(false, Ordering::SeqCst);
                    Ok(if n == 3 { Ack::Stop } else { Ack::Continue })
                })
            },
            |_error| {},
            || {},
        ));

        let strategy = OverflowStrategy::drop_newest(capacity(8));
        let probe = strategy.probe();
        let mut buffer = BufferedSubscriber::new(downstream, strategy, &context(&scheduler));
        for value in 0..6 {
            buffer.on_next(value);
        }

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!overlapped.load(Ordering::SeqCst));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert!(matches!(buffer.on_next(100), Signal::Ready(Ok(Ack::Stop))));

        let snapshot = probe.snapshot();
        assert_eq!(snapshot.delivered, 3);
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.depth, 0);
        assert!(!snapshot.delivering);
    }

    #[test]
    fn test_strategy_from_config() {
        let config = BufferConfig {
            capacity: 16,
            policy: DropPolicy::DropOldest,
        };
        let strategy = OverflowStrategy::<String>::from_config(&config).unwrap();
        assert_eq!(strategy.capacity(), 16);
        assert_eq!(strategy.policy(), DropPolicy::DropOldest);

        let zero = BufferConfig {
            capacity: 0,
            policy: DropPolicy::DropNewest,
        };
        assert_eq!(
            OverflowStrategy::<String>::from_config(&zero).unwrap_err(),
            ValidationError::ZeroBufferCapacity
        );
    }
}
