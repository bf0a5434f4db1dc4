// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::shared::SharedObserver;
use crate::engine::Observable;
use crate::errors::StreamError;
use crate::traits::{Ack, AckResult, Observer, Signal};

struct TakeObserver<T> {
    remaining: usize,
    downstream: SharedObserver<T>,
    done: bool,
}

/// Terminate downstream according to how it answered the last element.
fn finish<T>(downstream: &SharedObserver<T>, result: AckResult) -> AckResult {
    match result {
        Ok(Ack::Continue) => downstream.with(|d| d.on_complete()),
        Ok(Ack::Stop) => {}
        Err(error) => downstream.with(|d| d.on_error(error)),
    }
    Ok(Ack::Stop)
}

impl<T: Send + 'static> Observer<T> for TakeObserver<T> {
    fn on_next(&mut self, elem: T) -> Signal {
        if self.done {
            return Signal::STOP;
        }

        self.remaining -= 1;
        let signal = self.downstream.with(|d| d.on_next(elem));
        if self.remaining > 0 {
            return signal;
        }

        self.done = true;
        match signal {
            Signal::Ready(result) => Signal::Ready(finish(&self.downstream, result)),
            Signal::Pending(pending) => {
                let downstream = self.downstream.clone();
                Signal::Pending(pending.map(move |result| finish(&downstream, result)))
            }
        }
    }

    fn on_complete(&mut self) {
        if !self.done {
            self.done = true;
            self.downstream.with(|d| d.on_complete());
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if !self.done {
            self.done = true;
            self.downstream.with(|d| d.on_error(error));
        }
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Forward the first `n` elements, then complete and stop upstream.
    ///
    /// Completion is sent once the `n`-th element's signal resolves. `take(0)`
    /// completes without subscribing upstream at all.
    pub fn take(self, n: usize) -> Observable<T> {
        Observable::named("take", move |mut downstream, ctx| {
            if n == 0 {
                downstream.on_complete();
                return;
            }
            let observer = TakeObserver {
                remaining: n,
                downstream: SharedObserver::new(downstream),
                done: false,
            };
            self.subscribe_with(Box::new(observer), ctx);
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{Observable, Scheduler};
    use crate::traits::{Ack, FnObserver, Signal};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_take_stops_after_n() {
        let scheduler = Scheduler::current().unwrap();
        let values = Observable::from_iter(1..=100)
            .take(3)
            .to_vec(&scheduler)
            .await
            .unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_take_more_than_available() {
        let scheduler = Scheduler::current().unwrap();
        let values = Observable::from_iter(vec!['a', 'b'])
            .take(5)
            .to_vec(&scheduler)
            .await
            .unwrap();
        assert_eq!(values, vec!['a', 'b']);
    }

    #[tokio::test]
    async fn test_take_zero_never_subscribes_upstream() {
        let scheduler = Scheduler::current().unwrap();
        let subscribed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&subscribed);

        let upstream = Observable::<u8>::new(move |mut observer, _ctx| {
            flag.store(true, Ordering::SeqCst);
            observer.on_complete();
        });
        let values = upstream.take(0).to_vec(&scheduler).await.unwrap();

        assert!(values.is_empty());
        assert!(!subscribed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_waits_for_last_ack() {
        let scheduler = Scheduler::current().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let (next_log, complete_log) = (Arc::clone(&log), Arc::clone(&log));

        let observer = FnObserver::new(
            move |x: u32| {
                let log = Arc::clone(&next_log);
                Signal::pending(async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    log.lock().unwrap().push(format!("acked {}", x));
                    Ok(Ack::Continue)
                })
            },
            |_error| {},
            move || complete_log.lock().unwrap().push("complete".to_string()),
        );
        Observable::from_iter(0..10).take(2).subscribe(observer, &scheduler);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(*log.lock().unwrap(), vec!["acked 0", "acked 1", "complete"]);
    }
}
