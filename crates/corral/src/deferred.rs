//! One-shot completion handles.
//!
//! A [`Deferred`] is the producer half of a single-fulfillment promise: the
//! pool settles it exactly once with either a value or an error, and the
//! matching [`Outcome`] future yields that settlement to one consumer.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// Create a linked producer/consumer pair.
pub(crate) fn deferred<T>() -> (Deferred<T>, Outcome<T>) {
    let (tx, rx) = oneshot::channel();
    (Deferred { slot: Some(tx) }, Outcome { rx })
}

/// Producer half of a one-shot completion.
#[derive(Debug)]
pub(crate) struct Deferred<T> {
    slot: Option<oneshot::Sender<Result<T>>>,
}

impl<T> Deferred<T> {
    /// Fulfill the completion with `value`.
    ///
    /// Returns `None` when the value was delivered. Returns the value back
    /// when it could not be delivered: the consumer has gone away, or the
    /// completion was already settled. The caller decides what to do with an
    /// undeliverable value (the pool reclaims it).
    pub(crate) fn resolve(&mut self, value: T) -> Option<T> {
        match self.slot.take() {
            Some(tx) => match tx.send(Ok(value)) {
                Ok(()) => None,
                Err(returned) => returned.ok(),
            },
            None => Some(value),
        }
    }

    /// Reject the completion with `error`.
    ///
    /// Returns whether the error was delivered. A second settlement attempt
    /// is a no-op.
    pub(crate) fn reject(&mut self, error: Error) -> bool {
        match self.slot.take() {
            Some(tx) => tx.send(Err(error)).is_ok(),
            None => false,
        }
    }

    /// Whether this completion has already been settled by the producer.
    #[cfg(test)]
    pub(crate) fn is_settled(&self) -> bool {
        self.slot.is_none()
    }
}

/// Consumer half of a one-shot completion.
///
/// Resolves to [`Error::Shutdown`] if the producer is dropped without
/// settling; the pool always settles waiters it retires, so consumers only
/// observe that during teardown.
#[derive(Debug)]
pub(crate) struct Outcome<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for Outcome<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|settled| match settled {
            Ok(result) => result,
            Err(_) => Err(Error::Shutdown),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_delivers_value() {
        let (mut d, outcome) = deferred();
        assert!(!d.is_settled());
        assert!(d.resolve(42u32).is_none());
        assert!(d.is_settled());
        assert_eq!(outcome.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn reject_delivers_error() {
        let (mut d, outcome) = deferred::<u32>();
        assert!(d.reject(Error::Shutdown));
        assert!(matches!(outcome.await, Err(Error::Shutdown)));
    }

    #[tokio::test]
    async fn second_settlement_is_a_no_op() {
        let (mut d, outcome) = deferred();
        assert!(d.resolve(1u32).is_none());
        assert_eq!(d.resolve(2u32), Some(2));
        assert!(!d.reject(Error::Shutdown));
        assert_eq!(outcome.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn resolve_after_consumer_drop_returns_value() {
        let (mut d, outcome) = deferred();
        drop(outcome);
        assert_eq!(d.resolve(7u32), Some(7));
    }

    #[tokio::test]
    async fn dropped_producer_reads_as_shutdown() {
        let (d, outcome) = deferred::<u32>();
        drop(d);
        assert!(matches!(outcome.await, Err(Error::Shutdown)));
    }
}
