// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! A source that keeps sending without waiting to be asked.
//!
//! Used to put a [`buffered`](crate::engine::Observable::buffered) stage under
//! sustained overload. It only listens for termination: the first `Stop` or
//! failure, synchronous or not, latches a stop flag that is checked before
//! every send. A failure is then delivered downstream as the terminal error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::engine::observable::Observable;
use crate::engine::scheduler::{Scheduler, SubscriberContext};
use crate::errors::StreamError;
use crate::observability::messages::stream::{
    SourceExhausted, SourceStopped, SubscriptionCancelled, SubscriptionStarted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{Ack, AckResult, BoxObserver, Observer, Signal};

const SOURCE: &str = "unthrottled";

impl<T: Clone + Send + 'static> Observable<T> {
    /// Repeat `items` forever, ignoring backpressure except for termination.
    ///
    /// Never waits on a pending signal. Elements sent between a pending `Stop`
    /// and the moment it resolves are still delivered; put a buffer directly
    /// downstream. An empty list completes immediately.
    pub fn unthrottled(items: Vec<T>) -> Self {
        Observable::named(SOURCE, move |observer, ctx| {
            let SubscriberContext { scheduler, token } = ctx;
            let runner = scheduler.clone();
            runner.spawn(flood(items, observer, scheduler, token));
        })
    }
}

/// The first failure seen, shared with the watchers of pending signals.
type Failure = Arc<Mutex<Option<StreamError>>>;

fn latch(result: AckResult, stopped: &AtomicBool, failure: &Failure) {
    match result {
        Ok(Ack::Continue) => return,
        Ok(Ack::Stop) => {}
        Err(error) => {
            if let Ok(mut slot) = failure.lock() {
                slot.get_or_insert(error);
            }
        }
    }
    stopped.store(true, Ordering::Release);
}

async fn flood<T: Clone + Send + 'static>(
    items: Vec<T>,
    mut observer: BoxObserver<T>,
    scheduler: Scheduler,
    token: CancellationToken,
) {
    SubscriptionStarted { source: SOURCE }.log();
    if items.is_empty() {
        SourceExhausted {
            source: SOURCE,
            emitted: 0,
        }
        .log();
        observer.on_complete();
        return;
    }

    let stopped = Arc::new(AtomicBool::new(false));
    let failure: Failure = Arc::new(Mutex::new(None));
    let mut emitted = 0u64;
    let mut cursor = 0;

    while !stopped.load(Ordering::Acquire) {
        if token.is_cancelled() {
            SubscriptionCancelled {
                source: SOURCE,
                emitted,
            }
            .log();
            return;
        }

        let item = items[cursor].clone();
        cursor = (cursor + 1) % items.len();
        emitted += 1;

        match observer.on_next(item) {
            Signal::Ready(result) => latch(result, &stopped, &failure),
            Signal::Pending(pending) => {
                let (stopped, failure, watch) =
                    (Arc::clone(&stopped), Arc::clone(&failure), token.clone());
                scheduler.spawn(async move {
                    if let Some(result) = Signal::Pending(pending).resolve_or_cancel(&watch).await {
                        latch(result, &stopped, &failure);
                    }
                });
            }
        }

        tokio::task::yield_now().await;
    }

    let error = failure.lock().ok().and_then(|mut slot| slot.take());
    SourceStopped {
        source: SOURCE,
        emitted,
        reason: if error.is_some() {
            "downstream failed"
        } else {
            "downstream stopped"
        },
    }
    .log();
    if let Some(error) = error {
        observer.on_error(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::FnObserver;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_list_completes_immediately() {
        let scheduler = Scheduler::current().unwrap();
        let values: Vec<u8> = Observable::unthrottled(Vec::new())
            .to_vec(&scheduler)
            .await
            .unwrap();
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_repeats_list_until_stop() {
        let scheduler = Scheduler::current().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let observer = FnObserver::new(
            move |x: u32| {
                let mut seen = sink.lock().unwrap();
                seen.push(x);
                if seen.len() == 7 {
                    Signal::STOP
                } else {
                    Signal::CONTINUE
                }
            },
            |_error| {},
            || {},
        );
        Observable::unthrottled(vec![1, 2, 3]).subscribe(observer, &scheduler);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[tokio::test]
    async fn test_failed_ack_stops_and_delivers_error_once() {
        let scheduler = Scheduler::current().unwrap();
        let sent = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let completes = Arc::new(AtomicUsize::new(0));
        let (counter, error_log, done) =
            (Arc::clone(&sent), Arc::clone(&errors), Arc::clone(&completes));

        let observer = FnObserver::new(
            move |_x: u8| {
                if counter.fetch_add(1, Ordering::SeqCst) == 4 {
                    Signal::fail(StreamError::element_fault("sink", "full"))
                } else {
                    Signal::CONTINUE
                }
            },
            move |error| error_log.lock().unwrap().push(error),
            move || {
                done.fetch_add(1, Ordering::SeqCst);
            },
        );
        Observable::unthrottled(vec![1u8, 2]).subscribe(observer, &scheduler);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(sent.load(Ordering::SeqCst), 5);
        assert_eq!(
            *errors.lock().unwrap(),
            vec![StreamError::element_fault("sink", "full")]
        );
        assert_eq!(completes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pending_failure_is_delivered_as_terminal_error() {
        let scheduler = Scheduler::current().unwrap();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let error_log = Arc::clone(&errors);

        // Unguarded observer: the first ack fails only after the source has moved on.
        let observer = FnObserver::new(
            |x: u8| {
                if x == 1 {
                    Signal::pending(async {
                        tokio::task::yield_now().await;
                        Err(StreamError::element_fault("sink", "late failure"))
                    })
                } else {
                    Signal::CONTINUE
                }
            },
            move |error| error_log.lock().unwrap().push(error),
            || {},
        );

        let token = scheduler.subscription_token();
        tokio::time::timeout(
            Duration::from_secs(1),
            flood(vec![1u8, 2, 3], Box::new(observer), scheduler.clone(), token),
        )
        .await
        .unwrap();

        assert_eq!(
            *errors.lock().unwrap(),
            vec![StreamError::element_fault("sink", "late failure")]
        );
    }

    #[tokio::test]
    async fn test_cancel_halts_sending() {
        let scheduler = Scheduler::current().unwrap();
        let sent = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&sent);

        let observer = FnObserver::new(
            move |_x: u8| {
                counter.fetch_add(1, Ordering::SeqCst);
                Signal::CONTINUE
            },
            |_error| {},
            || {},
        );
        let cancelable = Observable::unthrottled(vec![1u8, 2]).subscribe(observer, &scheduler);
        tokio::time::sleep(Duration::from_millis(5)).await;
        cancelable.cancel();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let at_cancel = sent.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sent.load(Ordering::SeqCst), at_cancel);
    }
}
