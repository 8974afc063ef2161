//! The unit of protected work.
//!
//! An [`Operation`] is a cheap, cloneable handle around an async closure. Each
//! invocation receives a [`CancellationToken`]; operations that want to honor
//! optimistic timeouts (or executor shutdown) must observe it. Operations that
//! ignore the token still work, but only pessimistic timeouts can be relied on
//! to return control to the caller at the deadline.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, ResilienceError, ResilienceResult};

/// Boxed, sendable future returned by an operation invocation.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

type CallFn<T> = dyn Fn(CancellationToken) -> BoxFuture<ResilienceResult<T>> + Send + Sync;

/// An asynchronous, zero-argument unit of work.
pub struct Operation<T> {
    call: Arc<CallFn<T>>,
}

impl<T> Clone for Operation<T> {
    fn clone(&self) -> Self {
        Self {
            call: Arc::clone(&self.call),
        }
    }
}

impl<T> fmt::Debug for Operation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Operation<T> {
    /// Build an operation that already speaks [`ResilienceError`].
    ///
    /// Guards use this to wrap inner operations; errors pass through with
    /// their kind intact.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResilienceResult<T>> + Send + 'static,
    {
        Self {
            call: Arc::new(move |cancel| Box::pin(f(cancel))),
        }
    }

    /// Build an operation from a closure that ignores cancellation.
    ///
    /// Any error the closure returns becomes an `OperationFault`.
    pub fn from_fn<F, Fut, E>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::new(move |_cancel| {
            let fut = f();
            async move { fut.await.map_err(ResilienceError::fault) }
        })
    }

    /// Build an operation that observes the cancellation token.
    pub fn cancellable<F, Fut, E>(f: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::new(move |cancel| {
            let fut = f(cancel);
            async move { fut.await.map_err(ResilienceError::fault) }
        })
    }

    /// Start one invocation.
    pub fn call(&self, cancel: CancellationToken) -> BoxFuture<ResilienceResult<T>> {
        (self.call)(cancel)
    }
}

impl<T: Clone + Send + Sync + 'static> Operation<T> {
    /// An operation that always succeeds with `value`.
    pub fn ok(value: T) -> Self {
        Self::new(move |_cancel| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }
}

impl<T: Send + 'static> Operation<T> {
    /// An operation that always fails with an `OperationFault` carrying `message`.
    pub fn fail(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::new(move |_cancel| {
            let message = message.clone();
            async move { Err(ResilienceError::fault(message)) }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_from_fn_maps_errors_to_faults() {
        let op: Operation<u32> = Operation::from_fn(|| async { Err::<u32, _>("Error 1") });
        let err = op.call(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationFault);
        assert_eq!(err.to_string(), "operation fault: Error 1");
    }

    #[tokio::test]
    async fn test_operation_is_reusable() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let op = Operation::from_fn(move || {
            let c = c.clone();
            async move { Ok::<_, BoxError>(c.fetch_add(1, Ordering::SeqCst)) }
        });

        let first = op.clone();
        assert_eq!(first.call(CancellationToken::new()).await.unwrap(), 0);
        assert_eq!(op.call(CancellationToken::new()).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancellable_sees_token() {
        let op = Operation::cancellable(|cancel: CancellationToken| async move {
            Ok::<_, BoxError>(cancel.is_cancelled())
        });
        let token = CancellationToken::new();
        token.cancel();
        assert!(op.call(token).await.unwrap());
    }

    #[tokio::test]
    async fn test_constant_operations() {
        assert_eq!(Operation::ok(7).call(CancellationToken::new()).await.unwrap(), 7);
        let err = Operation::<()>::fail("nope")
            .call(CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "operation fault: nope");
    }
}
