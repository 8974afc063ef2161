//! Pipeline executor.
//!
//! Owns the root cancellation token. Every invocation receives a child of it,
//! so `shutdown()` reaches every in-flight operation that observes its token.

use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::error::{ResilienceError, ResilienceResult};
use crate::execution::batch::{join_all, BatchReport};
use crate::operation::{CancellationToken, Operation};
use crate::resilience::{Pipeline, Policy};

/// Classified result of one invocation.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The operation produced a value (possibly via fallback).
    Success(T),
    /// The operation itself failed.
    Failure(ResilienceError),
    /// A guard refused or abandoned the call.
    Rejected(ResilienceError),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }

    pub fn into_result(self) -> ResilienceResult<T> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(err) | Outcome::Rejected(err) => Err(err),
        }
    }
}

impl<T> From<ResilienceResult<T>> for Outcome<T> {
    fn from(result: ResilienceResult<T>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) if err.is_rejection() => Outcome::Rejected(err),
            Err(err) => Outcome::Failure(err),
        }
    }
}

/// Runs operations through a shared pipeline.
pub struct Executor<T> {
    pipeline: Arc<Pipeline<T>>,
    root: CancellationToken,
}

impl<T> Clone for Executor<T> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            root: self.root.clone(),
        }
    }
}

impl<T: Send + 'static> Executor<T> {
    pub fn new(pipeline: Pipeline<T>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            root: CancellationToken::new(),
        }
    }

    pub fn pipeline(&self) -> &Pipeline<T> {
        &self.pipeline
    }

    /// Run one invocation and classify the result.
    pub async fn execute(&self, op: &Operation<T>) -> Outcome<T> {
        let guarded = self.pipeline.wrap(op.clone());
        let span = tracing::info_span!("execute", execution_id = %Uuid::new_v4());
        let result = guarded.call(self.root.child_token()).instrument(span).await;

        let outcome = Outcome::from(result);
        match &outcome {
            Outcome::Success(_) => tracing::debug!("Execution succeeded"),
            Outcome::Failure(err) => tracing::debug!(error = %err, "Execution failed"),
            Outcome::Rejected(err) => {
                tracing::debug!(kind = %err.kind(), error = %err, "Execution rejected")
            }
        }
        outcome
    }

    /// Run every operation concurrently and wait for all of them.
    pub async fn execute_all(&self, ops: impl IntoIterator<Item = Operation<T>>) -> BatchReport<T> {
        let batch_id = Uuid::new_v4();
        let futures: Vec<_> = ops
            .into_iter()
            .enumerate()
            .map(|(index, op)| {
                let guarded = self.pipeline.wrap(op);
                let cancel = self.root.child_token();
                let span = tracing::info_span!("execute", %batch_id, index);
                guarded.call(cancel).instrument(span)
            })
            .collect();

        tracing::debug!(%batch_id, size = futures.len(), "Dispatching batch");
        join_all(futures).await
    }

    /// Signal every current and future invocation to stop.
    pub fn shutdown(&self) {
        tracing::info!("Executor shutdown requested");
        self.root.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.root.is_cancelled()
    }
}
