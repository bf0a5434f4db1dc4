// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt::Display;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::engine::Observable;
use crate::errors::{panic_message, StreamError};
use crate::observability::messages::operator::ElementFaulted;
use crate::observability::messages::StructuredLog;
use crate::traits::{BoxObserver, Observer, Signal};

/// Applies a fallible transformation per element. A failure (an `Err` or a
/// panic) ends the subscription: `on_error` downstream, `Stop` upstream.
struct MapObserver<T, R, F> {
    stage: &'static str,
    f: F,
    downstream: BoxObserver<R>,
    failed: bool,
    _input: PhantomData<fn(T)>,
}

impl<T, R, F> MapObserver<T, R, F> {
    fn new(stage: &'static str, f: F, downstream: BoxObserver<R>) -> Self {
        Self {
            stage,
            f,
            downstream,
            failed: false,
            _input: PhantomData,
        }
    }
}

impl<T, R, F> Observer<T> for MapObserver<T, R, F>
where
    R: Send,
    F: FnMut(T) -> Result<R, String> + Send,
{
    fn on_next(&mut self, elem: T) -> Signal {
        if self.failed {
            return Signal::STOP;
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| (self.f)(elem)))
            .unwrap_or_else(|payload| Err(format!("panicked: {}", panic_message(payload))));

        match outcome {
            Ok(mapped) => self.downstream.on_next(mapped),
            Err(message) => {
                self.failed = true;
                let error = StreamError::element_fault(self.stage, message);
                ElementFaulted {
                    stage: self.stage,
                    error: &error,
                }
                .log();
                self.downstream.on_error(error);
                Signal::STOP
            }
        }
    }

    fn on_complete(&mut self) {
        if !self.failed {
            self.downstream.on_complete();
        }
    }

    fn on_error(&mut self, error: StreamError) {
        if !self.failed {
            self.downstream.on_error(error);
        }
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Transform every element with `f`. Downstream signals pass through untouched.
    pub fn map<R, F>(self, mut f: F) -> Observable<R>
    where
        R: Send + 'static,
        F: FnMut(T) -> R + Send + 'static,
    {
        Observable::named("map", move |downstream, ctx| {
            let observer = MapObserver::new(
                "map",
                move |elem: T| -> Result<R, String> { Ok(f(elem)) },
                downstream,
            );
            self.subscribe_with(Box::new(observer), ctx);
        })
    }

    /// Like [`map`](Observable::map), but `f` may reject an element.
    pub fn try_map<R, E, F>(self, mut f: F) -> Observable<R>
    where
        R: Send + 'static,
        E: Display,
        F: FnMut(T) -> Result<R, E> + Send + 'static,
    {
        Observable::named("try_map", move |downstream, ctx| {
            let observer = MapObserver::new(
                "try_map",
                move |elem: T| -> Result<R, String> { f(elem).map_err(|e| e.to_string()) },
                downstream,
            );
            self.subscribe_with(Box::new(observer), ctx);
        })
    }
}
