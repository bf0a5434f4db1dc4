// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::errors::StreamError;
use crate::observability::messages::{stream::ProtocolViolated, StructuredLog};
use crate::traits::{Ack, BoxObserver, Observer, Signal};

/// Guard placed in front of every observer handed to a stage.
///
/// Enforces the observer grammar on behalf of the wrapped observer:
/// * nothing is delivered after a terminal event, and only one terminal is delivered
/// * after a `Stop` or failed ack, further elements are refused with `Stop`
/// * an `on_next` issued while the previous signal is unresolved is a contract
///   violation: it fails a debug assertion, and in release builds it is refused
///   with [`StreamError::ProtocolViolation`] without reaching the wrapped observer
pub(crate) struct SafeObserver<T> {
    stage: &'static str,
    inner: BoxObserver<T>,
    in_flight: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
    terminated: bool,
}

impl<T> SafeObserver<T> {
    pub(crate) fn new(stage: &'static str, inner: BoxObserver<T>) -> Self {
        Self {
            stage,
            inner,
            in_flight: Arc::new(AtomicBool::new(false)),
            stopped: Arc::new(AtomicBool::new(false)),
            terminated: false,
        }
    }

    fn violation(&self, detail: &'static str) -> StreamError {
        ProtocolViolated {
            stage: self.stage,
            detail,
        }
        .log();
        debug_assert!(
            false,
            "observer contract violated at '{}': {}",
            self.stage, detail
        );
        StreamError::protocol_violation(self.stage, detail)
    }
}

fn closes_subscription(result: &Result<Ack, StreamError>) -> bool {
    !matches!(result, Ok(Ack::Continue))
}

impl<T: Send> Observer<T> for SafeObserver<T> {
    fn on_next(&mut self, elem: T) -> Signal {
        if self.terminated || self.stopped.load(Ordering::Acquire) {
            return Signal::STOP;
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return Signal::fail(
                self.violation("on_next issued before the previous signal resolved"),
            );
        }

        match self.inner.on_next(elem) {
            Signal::Ready(result) => {
                self.in_flight.store(false, Ordering::Release);
                if closes_subscription(&result) {
                    self.stopped.store(true, Ordering::Release);
                }
                Signal::Ready(result)
            }
            Signal::Pending(pending) => {
                let in_flight = Arc::clone(&self.in_flight);
                let stopped = Arc::clone(&self.stopped);
                Signal::Pending(pending.inspect(move |result| {
                    if closes_subscription(result) {
                        stopped.store(true, Ordering::Release);
                    }
                    in_flight.store(false, Ordering::Release);
                }))
            }
        }
    }

    fn on_complete(&mut self) {
        if self.terminated {
            return;
        }
        if self.in_flight.load(Ordering::Acquire) {
            self.violation("on_complete issued while an element is in flight");
        }
        self.terminated = true;
        self.inner.on_complete();
    }

    fn on_error(&mut self, error: StreamError) {
        if self.terminated {
            return;
        }
        if self.in_flight.load(Ordering::Acquire) {
            self.violation("on_error issued while an element is in flight");
        }
        self.terminated = true;
        self.inner.on_error(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Events {
        next: Vec<u32>,
        completes: usize,
        errors: usize,
    }

    struct Recorder(Arc<Mutex<Events>>);

    impl Observer<u32> for Recorder {
        fn on_next(&mut self, elem: u32) -> Signal {
            self.0.lock().unwrap().next.push(elem);
            if elem == 99 {
                Signal::STOP
            } else {
                Signal::CONTINUE
            }
        }

        fn on_complete(&mut self) {
            self.0.lock().unwrap().completes += 1;
        }

        fn on_error(&mut self, _error: StreamError) {
            self.0.lock().unwrap().errors += 1;
        }
    }

    fn guarded() -> (SafeObserver<u32>, Arc<Mutex<Events>>) {
        let events = Arc::new(Mutex::new(Events::default()));
        let observer = SafeObserver::new("test", Box::new(Recorder(Arc::clone(&events))));
        (observer, events)
    }

    #[test]
    fn test_single_terminal_and_nothing_after_it() {
        let (mut observer, events) = guarded();

        assert!(matches!(observer.on_next(1), Signal::Ready(Ok(Ack::Continue))));
        observer.on_complete();
        observer.on_complete();
        observer.on_error(StreamError::Abandoned);
        assert!(matches!(observer.on_next(2), Signal::Ready(Ok(Ack::Stop))));

        let events = events.lock().unwrap();
        assert_eq!(events.next, vec![1]);
        assert_eq!(events.completes, 1);
        assert_eq!(events.errors, 0);
    }

    #[test]
    fn test_stop_refuses_later_elements_but_allows_terminal() {
        let (mut observer, events) = guarded();

        assert!(matches!(observer.on_next(99), Signal::Ready(Ok(Ack::Stop))));
        assert!(matches!(observer.on_next(3), Signal::Ready(Ok(Ack::Stop))));
        observer.on_complete();

        let events = events.lock().unwrap();
        assert_eq!(events.next, vec![99]);
        assert_eq!(events.completes, 1);
    }

    #[cfg(debug_assertions)]
    #[tokio::test]
    #[should_panic(expected = "observer contract violated")]
    async fn test_overlapping_on_next_is_asserted() {
        struct Slow;

        impl Observer<u32> for Slow {
            fn on_next(&mut self, _elem: u32) -> Signal {
                Signal::pending(async {
                    tokio::task::yield_now().await;
                    Ok(Ack::Continue)
                })
            }

            fn on_complete(&mut self) {}

            fn on_error(&mut self, _error: StreamError) {}
        }

        let mut observer = SafeObserver::new("overlapping", Box::new(Slow));
        let _first = observer.on_next(1);
        let _second = observer.on_next(2);
    }

    #[tokio::test]
    async fn test_pending_resolution_clears_in_flight() {
        struct Deferred;

        impl Observer<u32> for Deferred {
            fn on_next(&mut self, _elem: u32) -> Signal {
                Signal::pending(async { Ok(Ack::Continue) })
            }

            fn on_complete(&mut self) {}

            fn on_error(&mut self, _error: StreamError) {}
        }

        let mut observer = SafeObserver::new("sequential", Box::new(Deferred));
        for elem in 0..3 {
            let ack = observer.on_next(elem).resolve().await;
            assert_eq!(ack, Ok(Ack::Continue));
        }
    }
}
