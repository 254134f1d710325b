//! Per-pattern state machine
//!
//! A [`PatternLifecycle`] is a shared handle: the orchestrator keeps a clone
//! so the progress of a task that panicked can still be reported.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use trellis_core::DeployError;
use trellis_core::domain::run::PatternState;

#[derive(Debug)]
struct Inner {
    state: PatternState,
    transitions: Vec<PatternState>,
}

/// Tracks the state of one pattern and every state it went through
#[derive(Debug, Clone)]
pub struct PatternLifecycle {
    name: Arc<str>,
    inner: Arc<Mutex<Inner>>,
}

impl PatternLifecycle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            inner: Arc::new(Mutex::new(Inner {
                state: PatternState::Pending,
                transitions: vec![PatternState::Pending],
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Moves to `next`, rejecting transitions the state machine does not allow
    pub fn advance(&self, next: PatternState) -> Result<(), DeployError> {
        let mut inner = self.lock();
        if !inner.state.can_advance_to(next) {
            return Err(DeployError::Internal(format!(
                "illegal transition {} -> {} for '{}'",
                inner.state, next, self.name
            )));
        }

        debug!("Pattern '{}': {} -> {}", self.name, inner.state, next);
        inner.state = next;
        inner.transitions.push(next);
        Ok(())
    }

    /// Closes the lifecycle of a pattern whose pipeline never finished
    ///
    /// Goes through `Failed` when still on the error path, then to `Cleaned`.
    pub fn abort(&self) {
        for next in [PatternState::Failed, PatternState::Cleaned] {
            if self.state().can_advance_to(next) && self.advance(next).is_err() {
                break;
            }
        }
    }

    pub fn state(&self) -> PatternState {
        self.lock().state
    }

    pub fn transitions(&self) -> Vec<PatternState> {
        self.lock().transitions.clone()
    }
}
