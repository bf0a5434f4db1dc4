// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::future::Future;

use crate::errors::StreamError;

/// A per-element asynchronous computation, raced against a deadline by
/// [`map_task_with_timeout`](crate::engine::Observable::map_task_with_timeout).
///
/// Dropping the returned future abandons the work; tasks should not rely on
/// running to completion.
#[async_trait]
pub trait Task<T: Send + 'static, R: Send + 'static>: Send + Sync {
    async fn run(&self, input: T) -> Result<R, StreamError>;

    fn name(&self) -> &str;
}

/// Adapts a closure returning a future into a [`Task`].
pub struct FnTask<F> {
    name: String,
    f: F,
}

impl<F> FnTask<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<T, R, F, Fut> Task<T, R> for FnTask<F>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, StreamError>> + Send,
{
    async fn run(&self, input: T) -> Result<R, StreamError> {
        (self.f)(input).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_task_runs_closure() {
        let task = FnTask::new("double", |x: u32| async move { Ok::<_, StreamError>(x * 2) });
        assert_eq!(Task::<u32, u32>::name(&task), "double");
        assert_eq!(task.run(21).await, Ok(42));
    }
}
