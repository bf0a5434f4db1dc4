// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::{Arc, Mutex, PoisonError};

use crate::traits::BoxObserver;

/// A downstream observer reachable from both an operator and the pending
/// signals it hands out.
///
/// The observer contract already serialises every call, so the lock is never
/// contended; it exists because a `'static` pending future must own its way
/// back to the downstream.
pub(crate) struct SharedObserver<T> {
    inner: Arc<Mutex<BoxObserver<T>>>,
}

impl<T> SharedObserver<T> {
    pub(crate) fn new(observer: BoxObserver<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(observer)),
        }
    }

    /// Run `f` against the downstream. Never hold the result of `f` across an
    /// await if it borrows the observer.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut BoxObserver<T>) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl<T> Clone for SharedObserver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
