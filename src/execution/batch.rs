//! Collect-all join for concurrent operations.

use std::future::Future;

use futures_util::future;

use crate::error::{AggregateError, BatchFailure, ResilienceError, ResilienceResult};

/// Results of a batch, one per member in submission order.
#[derive(Debug)]
pub struct BatchReport<T> {
    results: Vec<ResilienceResult<T>>,
}

impl<T> BatchReport<T> {
    pub fn new(results: Vec<ResilienceResult<T>>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[ResilienceResult<T>] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failures(&self) -> usize {
        self.len() - self.successes()
    }

    /// All values, or every failure wrapped in one [`AggregateError`].
    pub fn into_result(self) -> Result<Vec<T>, AggregateError> {
        let total = self.results.len();
        let mut values = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (index, result) in self.results.into_iter().enumerate() {
            match result {
                Ok(value) => values.push(value),
                Err(error) => failures.push(BatchFailure { index, error }),
            }
        }

        if failures.is_empty() {
            Ok(values)
        } else {
            Err(AggregateError::new(total, failures))
        }
    }
}

/// Run every future on its own task and wait for all of them.
pub async fn join_all<T, F, I>(futures: I) -> BatchReport<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = ResilienceResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = futures.into_iter().map(tokio::spawn).collect();
    let total = handles.len();

    let results: Vec<_> = future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap_or_else(|join_err| Err(ResilienceError::fault(join_err))))
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        tracing::debug!(total, failed, "Batch completed with failures");
    }

    BatchReport::new(results)
}
