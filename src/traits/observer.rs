// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::StreamError;
use crate::traits::signal::Signal;

/// Consumer side of a subscription.
///
/// Callers guarantee that the three handlers are invoked sequentially: the
/// next `on_next` is issued only after the previous call's [`Signal`] has
/// resolved, and exactly one of `on_complete`/`on_error` ends the
/// subscription with nothing after it. Implementations therefore need no
/// locking around state touched only from these handlers.
pub trait Observer<T>: Send {
    /// Deliver one element and answer with backpressure.
    fn on_next(&mut self, elem: T) -> Signal;

    /// No more elements will arrive.
    fn on_complete(&mut self);

    /// The subscription failed.
    fn on_error(&mut self, error: StreamError);
}

/// Type-erased observer, as held by operators and sources.
pub type BoxObserver<T> = Box<dyn Observer<T>>;

impl<T, O> Observer<T> for Box<O>
where
    O: Observer<T> + ?Sized,
{
    fn on_next(&mut self, elem: T) -> Signal {
        (**self).on_next(elem)
    }

    fn on_complete(&mut self) {
        (**self).on_complete()
    }

    fn on_error(&mut self, error: StreamError) {
        (**self).on_error(error)
    }
}

/// Observer assembled from three closures.
pub struct FnObserver<N, E, C> {
    next: N,
    error: E,
    complete: C,
}

impl<N, E, C> FnObserver<N, E, C> {
    pub fn new<T>(next: N, error: E, complete: C) -> Self
    where
        N: FnMut(T) -> Signal + Send,
        E: FnMut(StreamError) + Send,
        C: FnMut() + Send,
    {
        Self {
            next,
            error,
            complete,
        }
    }
}

impl<T, N, E, C> Observer<T> for FnObserver<N, E, C>
where
    N: FnMut(T) -> Signal + Send,
    E: FnMut(StreamError) + Send,
    C: FnMut() + Send,
{
    fn on_next(&mut self, elem: T) -> Signal {
        (self.next)(elem)
    }

    fn on_complete(&mut self) {
        (self.complete)()
    }

    fn on_error(&mut self, error: StreamError) {
        (self.error)(error)
    }
}
