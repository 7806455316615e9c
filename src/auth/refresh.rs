//! Single-flight coordination of token refreshes.
//!
//! # States
//! - Idle: no refresh running, no waiters
//! - In flight: one leader is refreshing; later callers queue as waiters
//!
//! # State Transitions
//! ```text
//! Idle → In flight: first join() becomes the leader
//! In flight → Idle: leader settles (success or failure), waiters get the outcome
//! In flight → Idle: leader dropped unsettled, waiters see a closed channel
//! ```
//!
//! # Design Decisions
//! - The lock is never held across an await
//! - Draining happens in one place, so the flag cannot stay stuck
//! - Poisoned locks are recovered; the state is valid after any panic

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::errors::ApiError;
use crate::observability::metrics;

/// What every participant of one refresh cycle receives.
pub type RefreshOutcome = Result<String, ApiError>;

#[derive(Debug, Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Shared refresh state for one client.
#[derive(Debug, Default)]
pub struct SingleFlight {
    state: Mutex<RefreshState>,
}

/// Role assigned by [`SingleFlight::join`].
#[derive(Debug)]
pub enum Join<'a> {
    /// Run the refresh and settle it.
    Leader(LeaderGuard<'a>),
    /// Await the leader's outcome. A closed channel means the leader gave up.
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Become the leader of a new cycle, or queue behind the running one.
    pub fn join(&self) -> Join<'_> {
        let mut state = self.lock();
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            Join::Waiter(rx)
        } else {
            state.in_flight = true;
            Join::Leader(LeaderGuard {
                flight: self,
                settled: false,
            })
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    pub fn waiter_count(&self) -> usize {
        self.lock().waiters.len()
    }

    fn drain(&self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        let mut state = self.lock();
        state.in_flight = false;
        std::mem::take(&mut state.waiters)
    }
}

/// Held by the leader while its refresh runs.
///
/// Dropping it without calling [`settle`](LeaderGuard::settle) releases the
/// waiters with a closed channel.
#[derive(Debug)]
pub struct LeaderGuard<'a> {
    flight: &'a SingleFlight,
    settled: bool,
}

impl LeaderGuard<'_> {
    /// Publish the outcome to every waiter and reset the state. Returns the number notified.
    pub fn settle(mut self, outcome: RefreshOutcome) -> usize {
        self.settled = true;
        let waiters = self.flight.drain();
        let count = waiters.len();
        for waiter in waiters {
            // Receiver gone means that waiter was cancelled.
            let _ = waiter.send(outcome.clone());
        }
        count
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let waiters = self.flight.drain();
        metrics::record_refresh("abandoned");
        tracing::warn!(waiters = waiters.len(), "Token refresh abandoned by its leader");
    }
}
