//! Circuit breaker for protecting unreliable operations.
//!
//! # States
//! - Closed: normal operation, calls pass through and are recorded
//! - Open: operation assumed down, calls are rejected without being invoked
//! - Half-Open: exactly one trial call probes for recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: recorder trips (consecutive failures / failure ratio)
//! Open → Half-Open: first call after break_duration becomes the trial
//! Half-Open → Closed: trial succeeds (recorder reset)
//! Half-Open → Open: trial fails (opened_at = now)
//! ```
//!
//! # Design Decisions
//! - One mutex per breaker, never held across an await
//! - Admission hands out a permit stamped with the state epoch; outcomes
//!   from an older epoch are dropped
//! - A trial permit dropped without an outcome frees the trial slot

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{RejectReason, ResilienceError, ResilienceResult};
use crate::operation::{CancellationToken, Operation};
use crate::resilience::recorder::{ConsecutiveFailures, OutcomeRecorder, RecorderStats};
use crate::resilience::Policy;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Observable state of a breaker, for tests and logs.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub isolated: bool,
    pub stats: RecorderStats,
}

struct BreakerState<R> {
    circuit: CircuitState,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    isolated: bool,
    /// Bumped on every transition.
    epoch: u64,
    recorder: R,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermitKind {
    Closed,
    Trial,
}

/// State machine shared by the basic and advanced breakers.
pub(crate) struct BreakerCore<R> {
    name: String,
    break_duration: Duration,
    state: Mutex<BreakerState<R>>,
}

impl<R: OutcomeRecorder> BreakerCore<R> {
    pub(crate) fn new(name: String, break_duration: Duration, recorder: R) -> Self {
        Self {
            name,
            break_duration,
            state: Mutex::new(BreakerState {
                circuit: CircuitState::Closed,
                opened_at: None,
                trial_in_flight: false,
                isolated: false,
                epoch: 0,
                recorder,
            }),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reject(&self, reason: RejectReason) -> ResilienceError {
        tracing::debug!(circuit = %self.name, %reason, "Call rejected");
        ResilienceError::CircuitOpen {
            circuit: self.name.clone(),
            reason,
        }
    }

    /// Admit a call or reject it.
    fn acquire(&self) -> ResilienceResult<Permit<'_, R>> {
        let now = Instant::now();
        let mut state = self.lock();

        match state.circuit {
            CircuitState::Closed => Ok(Permit::new(self, PermitKind::Closed, state.epoch)),
            CircuitState::Open => {
                if state.isolated {
                    return Err(self.reject(RejectReason::Isolated));
                }
                let opened_at = state.opened_at.unwrap_or(now);
                let elapsed = now.saturating_duration_since(opened_at);
                if elapsed < self.break_duration {
                    return Err(self.reject(RejectReason::Open {
                        retry_after: self.break_duration - elapsed,
                    }));
                }

                state.circuit = CircuitState::HalfOpen;
                state.trial_in_flight = true;
                state.epoch += 1;
                tracing::info!(circuit = %self.name, "Circuit half-open, admitting trial call");
                Ok(Permit::new(self, PermitKind::Trial, state.epoch))
            }
            CircuitState::HalfOpen => {
                if state.trial_in_flight {
                    return Err(self.reject(RejectReason::TrialInFlight));
                }
                state.trial_in_flight = true;
                tracing::debug!(circuit = %self.name, "Admitting replacement trial call");
                Ok(Permit::new(self, PermitKind::Trial, state.epoch))
            }
        }
    }

    fn settle(&self, kind: PermitKind, epoch: u64, success: bool) {
        let now = Instant::now();
        let mut state = self.lock();
        if state.epoch != epoch {
            tracing::trace!(circuit = %self.name, "Ignoring outcome from a previous state");
            return;
        }

        match kind {
            PermitKind::Closed => {
                if state.recorder.record(success, now) {
                    let stats = state.recorder.stats(now);
                    self.trip(&mut state, now);
                    tracing::warn!(
                        circuit = %self.name,
                        failures = stats.failures,
                        total = stats.total,
                        failure_ratio = stats.failure_ratio,
                        break_ms = self.break_duration.as_millis() as u64,
                        "Circuit opened"
                    );
                }
            }
            PermitKind::Trial => {
                state.trial_in_flight = false;
                if success {
                    state.circuit = CircuitState::Closed;
                    state.opened_at = None;
                    state.epoch += 1;
                    state.recorder.reset();
                    tracing::info!(circuit = %self.name, "Circuit closed after successful trial");
                } else {
                    self.trip(&mut state, now);
                    tracing::warn!(circuit = %self.name, "Trial call failed, circuit re-opened");
                }
            }
        }
    }

    fn trip(&self, state: &mut BreakerState<R>, now: Instant) {
        state.circuit = CircuitState::Open;
        state.opened_at = Some(now);
        state.trial_in_flight = false;
        state.epoch += 1;
        state.recorder.reset();
    }

    fn release_trial(&self, epoch: u64) {
        let mut state = self.lock();
        if state.epoch == epoch && state.circuit == CircuitState::HalfOpen {
            state.trial_in_flight = false;
            tracing::debug!(circuit = %self.name, "Trial call abandoned, slot released");
        }
    }

    pub(crate) async fn run<T: Send + 'static>(
        &self,
        op: &Operation<T>,
        cancel: CancellationToken,
    ) -> ResilienceResult<T> {
        let permit = self.acquire()?;
        let result = op.call(cancel).await;
        permit.settle(result.is_ok());
        result
    }

    pub(crate) fn state(&self) -> CircuitState {
        let state = self.lock();
        match state.circuit {
            CircuitState::Open if !state.isolated => {
                let elapsed = state
                    .opened_at
                    .map(|at| Instant::now().saturating_duration_since(at))
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.break_duration {
                    CircuitState::HalfOpen
                } else {
                    CircuitState::Open
                }
            }
            other => other,
        }
    }

    pub(crate) fn snapshot(&self) -> BreakerSnapshot {
        let circuit = self.state();
        let mut state = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: circuit,
            isolated: state.isolated,
            stats: state.recorder.stats(Instant::now()),
        }
    }

    pub(crate) fn isolate(&self) {
        let mut state = self.lock();
        state.circuit = CircuitState::Open;
        state.opened_at = Some(Instant::now());
        state.trial_in_flight = false;
        state.isolated = true;
        state.epoch += 1;
        state.recorder.reset();
        tracing::warn!(circuit = %self.name, "Circuit isolated manually");
    }

    pub(crate) fn reset(&self) {
        let mut state = self.lock();
        state.circuit = CircuitState::Closed;
        state.opened_at = None;
        state.trial_in_flight = false;
        state.isolated = false;
        state.epoch += 1;
        state.recorder.reset();
        tracing::info!(circuit = %self.name, "Circuit reset manually");
    }
}

/// Admission ticket for one call.
struct Permit<'a, R: OutcomeRecorder> {
    core: &'a BreakerCore<R>,
    kind: PermitKind,
    epoch: u64,
    settled: bool,
}

impl<'a, R: OutcomeRecorder> Permit<'a, R> {
    fn new(core: &'a BreakerCore<R>, kind: PermitKind, epoch: u64) -> Self {
        Self {
            core,
            kind,
            epoch,
            settled: false,
        }
    }

    fn settle(mut self, success: bool) {
        self.settled = true;
        self.core.settle(self.kind, self.epoch, success);
    }
}

impl<R: OutcomeRecorder> Drop for Permit<'_, R> {
    fn drop(&mut self) {
        if !self.settled && self.kind == PermitKind::Trial {
            self.core.release_trial(self.epoch);
        }
    }
}

/// Basic circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a trial call is allowed.
    pub break_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 2,
            break_duration: Duration::from_secs(1),
        }
    }
}

/// Breaker that trips after a run of consecutive failures.
///
/// Cloning shares the underlying state, so one instance can guard a call site
/// from many tasks.
#[derive(Clone)]
pub struct CircuitBreaker {
    core: Arc<BreakerCore<ConsecutiveFailures>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        tracing::debug!(
            circuit = %name,
            failure_threshold = config.failure_threshold,
            break_ms = config.break_duration.as_millis() as u64,
            "Circuit breaker initialized"
        );
        Self {
            core: Arc::new(BreakerCore::new(
                name,
                config.break_duration,
                ConsecutiveFailures::new(config.failure_threshold),
            )),
        }
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn state(&self) -> CircuitState {
        self.core.state()
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        self.core.snapshot()
    }

    /// Hold the circuit open until [`reset`](Self::reset) is called.
    pub fn isolate(&self) {
        self.core.isolate();
    }

    /// Force the circuit closed and clear recorded failures.
    pub fn reset(&self) {
        self.core.reset();
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.core.name())
            .field("state", &self.core.state())
            .finish()
    }
}

impl<T: Send + 'static> Policy<T> for CircuitBreaker {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn wrap(&self, inner: Operation<T>) -> Operation<T> {
        let core = Arc::clone(&self.core);
        Operation::new(move |cancel| {
            let core = Arc::clone(&core);
            let inner = inner.clone();
            async move { core.run(&inner, cancel).await }
        })
    }
}
