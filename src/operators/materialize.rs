// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio_util::sync::CancellationToken;

use crate::engine::{Observable, Scheduler};
use crate::errors::StreamError;
use crate::traits::{Ack, AckResult, BoxObserver, Observer, Signal};

/// One event of a stream, carried as an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification<T> {
    Next(T),
    Error(StreamError),
    Complete,
}

impl<T> Notification<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Next(_))
    }
}

struct MaterializeObserver<T> {
    downstream: Option<BoxObserver<Notification<T>>>,
    scheduler: Scheduler,
    token: CancellationToken,
}

fn close<T>(mut downstream: BoxObserver<Notification<T>>, result: AckResult) {
    match result {
        Ok(Ack::Continue) => downstream.on_complete(),
        Ok(Ack::Stop) => {}
        Err(error) => downstream.on_error(error),
    }
}

impl<T: Send + 'static> MaterializeObserver<T> {
    /// Deliver the terminal as an element, then complete once it is acknowledged.
    fn finish(&mut self, last: Notification<T>) {
        let Some(mut downstream) = self.downstream.take() else {
            return;
        };
        match downstream.on_next(last) {
            Signal::Ready(result) => close(downstream, result),
            pending => {
                let token = self.token.clone();
                self.scheduler.spawn(async move {
                    if let Some(result) = pending.resolve_or_cancel(&token).await {
                        close(downstream, result);
                    }
                });
            }
        }
    }
}

impl<T: Send + 'static> Observer<T> for MaterializeObserver<T> {
    fn on_next(&mut self, elem: T) -> Signal {
        match self.downstream.as_mut() {
            Some(downstream) => downstream.on_next(Notification::Next(elem)),
            None => Signal::STOP,
        }
    }

    fn on_complete(&mut self) {
        self.finish(Notification::Complete);
    }

    fn on_error(&mut self, error: StreamError) {
        self.finish(Notification::Error(error));
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Turn the stream's events into elements.
    ///
    /// Every element arrives as [`Notification::Next`]; the upstream's
    /// terminal event arrives as a final `Error` or `Complete` element, after
    /// which the materialized stream completes normally.
    pub fn materialize(self) -> Observable<Notification<T>> {
        Observable::named("materialize", move |downstream, ctx| {
            let observer = MaterializeObserver {
                downstream: Some(downstream),
                scheduler: ctx.scheduler.clone(),
                token: ctx.token.clone(),
            };
            self.subscribe_with(Box::new(observer), ctx);
        })
    }
}
