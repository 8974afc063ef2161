//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use resilience_policy::error::BoxError;
use resilience_policy::Operation;

/// Counts how many times an operation body actually ran.
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicU32>);

#[allow(dead_code)]
impl Calls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    fn hit(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// Operation that always fails with `Error {n}`, n being its call number.
#[allow(dead_code)]
pub fn failing(calls: &Calls) -> Operation<&'static str> {
    let calls = calls.clone();
    Operation::from_fn(move || {
        let n = calls.hit();
        async move { Err::<&'static str, _>(format!("Error {}", n)) }
    })
}

/// Operation that sleeps for `delay` and then returns `value`.
#[allow(dead_code)]
pub fn sleeping(calls: &Calls, delay: Duration, value: &'static str) -> Operation<&'static str> {
    let calls = calls.clone();
    Operation::from_fn(move || {
        calls.hit();
        async move {
            tokio::time::sleep(delay).await;
            Ok::<_, BoxError>(value)
        }
    })
}

/// Operation whose outcome is chosen per call by `f(call_number)`.
#[allow(dead_code)]
pub fn programmable<F>(calls: &Calls, f: F) -> Operation<&'static str>
where
    F: Fn(u32) -> Result<&'static str, String> + Send + Sync + 'static,
{
    let calls = calls.clone();
    Operation::from_fn(move || {
        let result = f(calls.hit());
        async move { result }
    })
}
