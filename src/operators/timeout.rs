// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-element asynchronous work raced against a deadline.
//!
//! Each element starts a [`Task`] and a timer. Whichever finishes first
//! decides what goes downstream: the task's result, or the fallback value when
//! the timer wins. The loser is dropped, so a late result can never follow a
//! fallback that was already forwarded. When both are ready at once the task
//! wins.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::engine::shared::SharedObserver;
use crate::engine::Observable;
use crate::errors::{panic_message, StreamError};
use crate::observability::messages::operator::{ElementFaulted, TaskCompleted, TimeoutFired};
use crate::observability::messages::StructuredLog;
use crate::traits::{Ack, AckResult, Observer, PendingAck, Signal, Task};

struct TimeoutObserver<T: Send + 'static, R: Send + 'static> {
    task: Arc<dyn Task<T, R>>,
    stage: Arc<str>,
    timeout: Duration,
    fallback: R,
    downstream: SharedObserver<R>,
    token: CancellationToken,
    failed: Arc<AtomicBool>,
}

enum Race<R> {
    Cancelled,
    Finished(Result<R, StreamError>),
    TimedOut,
}

async fn race<T, R>(
    task: Arc<dyn Task<T, R>>,
    stage: Arc<str>,
    input: T,
    timeout: Duration,
    work: CancellationToken,
) -> Race<R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    let run = AssertUnwindSafe(task.run(input)).catch_unwind();
    tokio::select! {
        biased;
        _ = work.cancelled() => Race::Cancelled,
        outcome = run => Race::Finished(outcome.unwrap_or_else(|payload| {
            Err(StreamError::element_fault(
                stage.to_string(),
                format!("panicked: {}", panic_message(payload)),
            ))
        })),
        _ = tokio::time::sleep(timeout) => Race::TimedOut,
    }
}

impl<T, R> Observer<T> for TimeoutObserver<T, R>
where
    T: Send + 'static,
    R: Clone + Send + 'static,
{
    fn on_next(&mut self, elem: T) -> Signal {
        if self.failed.load(Ordering::Acquire) {
            return Signal::STOP;
        }

        let work = self.token.child_token();
        let task = Arc::clone(&self.task);
        let stage = Arc::clone(&self.stage);
        let timeout = self.timeout;
        let fallback = self.fallback.clone();
        let downstream = self.downstream.clone();
        let failed = Arc::clone(&self.failed);
        let race_token = work.clone();

        Signal::Pending(PendingAck::cancellable(
            async move {
                let started = Instant::now();
                let outcome = race(task, Arc::clone(&stage), elem, timeout, race_token.clone());
                let value = match outcome.await {
                    Race::Cancelled => return Ok(Ack::Stop),
                    Race::Finished(Ok(value)) => {
                        TaskCompleted {
                            stage: &stage,
                            duration: started.elapsed(),
                        }
                        .log();
                        value
                    }
                    Race::TimedOut => {
                        TimeoutFired {
                            stage: &stage,
                            timeout,
                        }
                        .log();
                        fallback
                    }
                    Race::Finished(Err(error)) => {
                        failed.store(true, Ordering::Release);
                        ElementFaulted {
                            stage: &stage,
                            error: &error,
                        }
                        .log();
                        downstream.with(|d| d.on_error(error));
                        return Ok(Ack::Stop);
                    }
                };

                let signal = downstream.with(|d| d.on_next(value));
                forward(signal, &race_token).await
            },
            work,
        ))
    }

    fn on_complete(&mut self) {
        if !self.failed.swap(true, Ordering::AcqRel) {
            self.downstream.with(|d| d.on_complete());
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if !self.failed.swap(true, Ordering::AcqRel) {
            self.downstream.with(|d| d.on_error(error));
        }
    }
}

/// Downstream's answer becomes ours; cancellation reads as `Stop`.
async fn forward(signal: Signal, token: &CancellationToken) -> AckResult {
    signal
        .resolve_or_cancel(token)
        .await
        .unwrap_or(Ok(Ack::Stop))
}

impl<T: Send + 'static> Observable<T> {
    /// Run `task` for every element, forwarding `fallback` instead of any
    /// result that takes longer than `timeout`.
    ///
    /// Elements are processed one at a time. A task error or panic ends the
    /// subscription with [`StreamError::ElementFault`].
    pub fn map_task_with_timeout<R>(
        self,
        task: Arc<dyn Task<T, R>>,
        timeout: Duration,
        fallback: R,
    ) -> Observable<R>
    where
        R: Clone + Send + 'static,
    {
        Observable::named("map_task_with_timeout", move |downstream, ctx| {
            let observer = TimeoutObserver {
                stage: Arc::from(task.name()),
                task,
                timeout,
                fallback,
                downstream: SharedObserver::new(downstream),
                token: ctx.token.clone(),
                failed: Arc::new(AtomicBool::new(false)),
            };
            self.subscribe_with(Box::new(observer), ctx);
        })
    }
}
