//! Fallback substitution.
//!
//! Swallows errors of declared kinds and answers with a fallback operation's
//! result instead. The fallback action runs exactly once per intercepted
//! failure and is not wrapped by any other policy; its own failure reaches the
//! caller unchanged.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{ErrorKind, ResilienceResult};
use crate::operation::{CancellationToken, Operation};
use crate::resilience::Policy;

/// Fallback guard.
pub struct FallbackPolicy<T> {
    handled: Arc<HashSet<ErrorKind>>,
    action: Operation<T>,
}

impl<T> Clone for FallbackPolicy<T> {
    fn clone(&self) -> Self {
        Self {
            handled: Arc::clone(&self.handled),
            action: self.action.clone(),
        }
    }
}

impl<T> std::fmt::Debug for FallbackPolicy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackPolicy")
            .field("handled", &self.handled)
            .finish_non_exhaustive()
    }
}

/// Collects the handled error kinds before the action is supplied.
pub struct FallbackBuilder<T> {
    handled: HashSet<ErrorKind>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> FallbackBuilder<T> {
    /// Also handle `kind`.
    pub fn or(mut self, kind: ErrorKind) -> Self {
        self.handled.insert(kind);
        self
    }

    /// Finish with the operation to run when a handled error occurs.
    pub fn to(self, action: Operation<T>) -> FallbackPolicy<T> {
        FallbackPolicy {
            handled: Arc::new(self.handled),
            action,
        }
    }
}

impl<T: Send + 'static> FallbackPolicy<T> {
    /// Start a fallback handling `kind`.
    pub fn handle(kind: ErrorKind) -> FallbackBuilder<T> {
        FallbackBuilder {
            handled: HashSet::new(),
            _marker: PhantomData,
        }
        .or(kind)
    }

    /// Fallback handling every kind in `kinds`.
    pub fn handling(kinds: impl IntoIterator<Item = ErrorKind>, action: Operation<T>) -> Self {
        Self {
            handled: Arc::new(kinds.into_iter().collect()),
            action,
        }
    }

    pub fn handles(&self, kind: ErrorKind) -> bool {
        self.handled.contains(&kind)
    }

    async fn run(&self, op: &Operation<T>, cancel: CancellationToken) -> ResilienceResult<T> {
        match op.call(cancel.clone()).await {
            Ok(value) => Ok(value),
            Err(err) if self.handles(err.kind()) => {
                tracing::info!(kind = %err.kind(), error = %err, "Running fallback action");
                self.action.call(cancel).await
            }
            Err(err) => Err(err),
        }
    }
}

impl<T: Send + 'static> Policy<T> for FallbackPolicy<T> {
    fn name(&self) -> &str {
        "fallback"
    }

    fn wrap(&self, inner: Operation<T>) -> Operation<T> {
        let policy = self.clone();
        Operation::new(move |cancel| {
            let policy = policy.clone();
            let inner = inner.clone();
            async move { policy.run(&inner, cancel).await }
        })
    }
}
