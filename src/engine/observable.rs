// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::engine::safe_observer::SafeObserver;
use crate::engine::scheduler::{Cancelable, Scheduler, SubscriberContext};
use crate::errors::StreamError;
use crate::observability::messages::stream::{
    SourceExhausted, SourceStopped, SubscriptionCancelled, SubscriptionStarted,
};
use crate::observability::messages::StructuredLog;
use crate::traits::{Ack, BoxObserver, Observer, Signal};

type OnSubscribe<T> = Box<dyn FnOnce(BoxObserver<T>, SubscriberContext) + Send>;

/// A cold, push-based producer of `T`.
///
/// Nothing happens until [`subscribe`](Observable::subscribe) is called; each
/// `Observable` value is consumed by exactly one subscription. Operators take
/// `self` and return a new `Observable`, so a pipeline reads top to bottom:
///
/// ```
/// use the_sluice::engine::{Observable, Scheduler};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), the_sluice::errors::StreamError> {
/// let scheduler = Scheduler::current()?;
/// let doubled = Observable::from_iter(vec![1, 2, 3])
///     .map(|x| x * 2)
///     .to_vec(&scheduler)
///     .await?;
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # Ok(())
/// # }
/// ```
pub struct Observable<T> {
    stage: &'static str,
    on_subscribe: OnSubscribe<T>,
}

impl<T: Send + 'static> Observable<T> {
    /// General constructor. `on_subscribe` receives the (guarded) downstream and
    /// the subscription context and must start production, usually by spawning
    /// on `ctx.scheduler`. It must honour the observer contract and stop once
    /// `ctx.token` is cancelled.
    pub fn new<F>(on_subscribe: F) -> Self
    where
        F: FnOnce(BoxObserver<T>, SubscriberContext) + Send + 'static,
    {
        Self::named("custom", on_subscribe)
    }

    pub(crate) fn named<F>(stage: &'static str, on_subscribe: F) -> Self
    where
        F: FnOnce(BoxObserver<T>, SubscriberContext) + Send + 'static,
    {
        Self {
            stage,
            on_subscribe: Box::new(on_subscribe),
        }
    }

    /// Finite source that waits for every acknowledgement before sending the next element.
    pub fn from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        let stream = futures::stream::iter(items);
        Self::from_stream_named("from_iter", stream)
    }

    /// Source pulling from any `Stream`; completes when the stream ends.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self::from_stream_named("from_stream", stream)
    }

    /// Source fed by an external producer through a channel. Completes once
    /// every sender has been dropped.
    pub fn from_receiver(receiver: mpsc::Receiver<T>) -> Self {
        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|elem| (elem, receiver))
        });
        Self::from_stream_named("from_receiver", stream)
    }

    fn from_stream_named<S>(source: &'static str, stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
    {
        Self::named(source, move |observer, ctx| {
            let SubscriberContext { scheduler, token } = ctx;
            scheduler.spawn(drive(source, stream, observer, token));
        })
    }

    /// Start the pipeline, delivering into `observer`.
    pub fn subscribe<O>(self, observer: O, scheduler: &Scheduler) -> Cancelable
    where
        O: Observer<T> + 'static,
    {
        let token = scheduler.subscription_token();
        let ctx = SubscriberContext {
            scheduler: scheduler.clone(),
            token: token.clone(),
        };
        self.subscribe_with(Box::new(observer), ctx);
        Cancelable::new(token)
    }

    /// Subscribe as part of an existing subscription; used by operators to
    /// attach themselves to their upstream.
    pub fn subscribe_with(self, observer: BoxObserver<T>, ctx: SubscriberContext) {
        let guarded = SafeObserver::new(self.stage, observer);
        (self.on_subscribe)(Box::new(guarded), ctx)
    }

    /// Run to exhaustion and collect every element.
    ///
    /// Fails with the stream's error, or with [`StreamError::Abandoned`] if the
    /// pipeline stopped without a terminal event.
    pub async fn to_vec(self, scheduler: &Scheduler) -> Result<Vec<T>, StreamError> {
        let (reply, outcome) = oneshot::channel();
        let collector = Collector {
            items: Vec::new(),
            reply: Some(reply),
        };
        self.subscribe(collector, scheduler);
        outcome.await.map_err(|_| StreamError::Abandoned)?
    }

    /// Run to exhaustion, handing each element to `callback`.
    pub async fn for_each<F>(self, scheduler: &Scheduler, callback: F) -> Result<(), StreamError>
    where
        F: FnMut(T) + Send + 'static,
    {
        let (reply, outcome) = oneshot::channel();
        let sink = CallbackSink {
            callback,
            reply: Some(reply),
        };
        self.subscribe(sink, scheduler);
        outcome.await.map_err(|_| StreamError::Abandoned)?
    }
}

/// Production loop shared by every backpressure-honouring source.
async fn drive<T, S>(
    source: &'static str,
    stream: S,
    mut observer: BoxObserver<T>,
    token: CancellationToken,
) where
    T: Send + 'static,
    S: Stream<Item = T> + Send,
{
    let mut stream = Box::pin(stream);
    let mut emitted = 0u64;
    SubscriptionStarted { source }.log();

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            next = stream.next() => Some(next),
        };
        let elem = match next {
            None => {
                SubscriptionCancelled { source, emitted }.log();
                return;
            }
            Some(None) => {
                SourceExhausted { source, emitted }.log();
                observer.on_complete();
                return;
            }
            Some(Some(elem)) => elem,
        };

        emitted += 1;
        match observer.on_next(elem).resolve_or_cancel(&token).await {
            None => {
                SubscriptionCancelled { source, emitted }.log();
                return;
            }
            Some(Ok(Ack::Continue)) => {}
            Some(Ok(Ack::Stop)) => {
                SourceStopped {
                    source,
                    emitted,
                    reason: "downstream stopped",
                }
                .log();
                return;
            }
            Some(Err(error)) => {
                SourceStopped {
                    source,
                    emitted,
                    reason: "downstream failed",
                }
                .log();
                observer.on_error(error);
                return;
            }
        }
    }
}

type Reply<T> = Option<oneshot::Sender<Result<T, StreamError>>>;

fn send_reply<T>(reply: &mut Reply<T>, outcome: Result<T, StreamError>) {
    if let Some(reply) = reply.take() {
        let _ = reply.send(outcome);
    }
}

struct Collector<T> {
    items: Vec<T>,
    reply: Reply<Vec<T>>,
}

impl<T: Send> Observer<T> for Collector<T> {
    fn on_next(&mut self, elem: T) -> Signal {
        self.items.push(elem);
        Signal::CONTINUE
    }

    fn on_complete(&mut self) {
        let items = std::mem::take(&mut self.items);
        send_reply(&mut self.reply, Ok(items));
    }

    fn on_error(&mut self, error: StreamError) {
        send_reply(&mut self.reply, Err(error));
    }
}

struct CallbackSink<F> {
    callback: F,
    reply: Reply<()>,
}

impl<T, F> Observer<T> for CallbackSink<F>
where
    F: FnMut(T) + Send,
{
    fn on_next(&mut self, elem: T) -> Signal {
        (self.callback)(elem);
        Signal::CONTINUE
    }

    fn on_complete(&mut self) {
        send_reply(&mut self.reply, Ok(()));
    }

    fn on_error(&mut self, error: StreamError) {
        send_reply(&mut self.reply, Err(error));
    }
}
