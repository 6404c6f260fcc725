use chrono::{DateTime, TimeDelta, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};
use tracing::{debug, info, warn};

use crate::{
    config::AttemptPolicy,
    error::Error,
    types::{AttemptId, AttemptState, AttemptWindow, SaveReceipt},
};

type SharedWindow = Arc<Mutex<AttemptWindow>>;

/// A live window, or what is left of one after retirement
#[derive(Debug, Clone)]
enum Slot {
    Live(SharedWindow),
    Retired { hard_deadline: DateTime<Utc> },
}

/// Tracks the timing window of every live attempt and decides whether a save
/// may be persisted.
///
/// Evaluations for one attempt are serialised by that attempt's own mutex;
/// the map itself is only write-locked to add or retire attempts, so
/// different attempts never wait on each other.
///
/// Retiring an attempt drops its window but keeps its id and hard deadline,
/// so the id can never be started again and every later save is rejected.
#[derive(Debug, Default)]
pub struct AttemptClock {
    policy: AttemptPolicy,
    attempts: RwLock<HashMap<AttemptId, Slot>>,
}

impl AttemptClock {
    pub fn new(policy: AttemptPolicy) -> Self {
        Self {
            policy,
            attempts: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &AttemptPolicy {
        &self.policy
    }

    /// Open a window with the policy's grace buffer
    pub fn start_attempt(
        &self,
        attempt_id: AttemptId,
        start: DateTime<Utc>,
        allotted: TimeDelta,
    ) -> Result<AttemptWindow, Error> {
        self.start_attempt_with_grace(attempt_id, start, allotted, self.policy.grace_buffer())
    }

    pub fn start_attempt_with_grace(
        &self,
        attempt_id: AttemptId,
        start: DateTime<Utc>,
        allotted: TimeDelta,
        grace_buffer: TimeDelta,
    ) -> Result<AttemptWindow, Error> {
        let window = AttemptWindow::new(attempt_id.clone(), start, allotted, grace_buffer)?;

        let mut attempts = self.attempts.write().unwrap_or_else(PoisonError::into_inner);
        if attempts.contains_key(&attempt_id) {
            return Err(Error::AttemptExists(attempt_id));
        }
        attempts.insert(attempt_id, Slot::Live(Arc::new(Mutex::new(window.clone()))));

        debug!(
            attempt_id = %window.attempt_id,
            hard_deadline = %window.hard_deadline,
            grace_ms = window.grace_buffer.num_milliseconds(),
            "Attempt started"
        );
        Ok(window)
    }

    /// Decide whether a save stamped `now` may be persisted.
    ///
    /// The first accepted save closes the attempt, as does the first save
    /// arriving after the grace buffer. Saves for a retired attempt are
    /// always rejected.
    pub fn evaluate_save(
        &self,
        attempt_id: &AttemptId,
        now: DateTime<Utc>,
    ) -> Result<SaveReceipt, Error> {
        let shared = match self.slot(attempt_id)? {
            Slot::Live(shared) => shared,
            Slot::Retired { hard_deadline } => {
                warn!(attempt_id = %attempt_id, "Save rejected, attempt retired");
                return Err(Error::DeadlineExceeded {
                    attempt_id: attempt_id.clone(),
                    hard_deadline,
                });
            }
        };
        let mut window = lock(&shared);

        match window.state_at(now) {
            state @ (AttemptState::Open | AttemptState::GraceWindow) => {
                window.closed = true;
                let in_grace = state == AttemptState::GraceWindow;
                info!(attempt_id = %attempt_id, in_grace, "Save accepted");
                Ok(SaveReceipt {
                    attempt_id: attempt_id.clone(),
                    accepted_at: now,
                    in_grace,
                })
            }
            AttemptState::Closed => {
                let already_closed = window.closed;
                window.closed = true;
                warn!(
                    attempt_id = %attempt_id,
                    hard_deadline = %window.hard_deadline,
                    already_closed,
                    "Save rejected, deadline exceeded"
                );
                Err(Error::DeadlineExceeded {
                    attempt_id: attempt_id.clone(),
                    hard_deadline: window.hard_deadline,
                })
            }
        }
    }

    pub fn state(&self, attempt_id: &AttemptId, now: DateTime<Utc>) -> Result<AttemptState, Error> {
        match self.slot(attempt_id)? {
            Slot::Live(shared) => Ok(lock(&shared).state_at(now)),
            Slot::Retired { .. } => Ok(AttemptState::Closed),
        }
    }

    /// Snapshot of a live attempt's window
    pub fn window(&self, attempt_id: &AttemptId) -> Result<AttemptWindow, Error> {
        match self.slot(attempt_id)? {
            Slot::Live(shared) => Ok(lock(&shared).clone()),
            Slot::Retired { .. } => Err(Error::AttemptRetired(attempt_id.clone())),
        }
    }

    /// Close an attempt for good and drop its window, returning the window
    /// as it was at retirement.
    pub fn retire(&self, attempt_id: &AttemptId) -> Result<AttemptWindow, Error> {
        let mut attempts = self.attempts.write().unwrap_or_else(PoisonError::into_inner);
        let slot = attempts
            .get_mut(attempt_id)
            .ok_or_else(|| Error::UnknownAttempt(attempt_id.clone()))?;
        let Slot::Live(shared) = slot else {
            return Err(Error::AttemptRetired(attempt_id.clone()));
        };

        let window = {
            let mut live = lock(shared);
            let window = live.clone();
            // A save still holding this window must not be accepted.
            live.closed = true;
            window
        };
        *slot = Slot::Retired {
            hard_deadline: window.hard_deadline,
        };
        debug!(attempt_id = %attempt_id, closed = window.closed, "Attempt retired");
        Ok(window)
    }

    /// Retire every live attempt that is closed at `now`, returning how many
    /// were retired.
    pub fn retire_closed(&self, now: DateTime<Utc>) -> usize {
        let mut attempts = self.attempts.write().unwrap_or_else(PoisonError::into_inner);
        let mut retired = 0;
        for slot in attempts.values_mut() {
            let Slot::Live(shared) = slot else {
                continue;
            };
            let hard_deadline = {
                let mut window = lock(shared);
                if window.state_at(now) != AttemptState::Closed {
                    continue;
                }
                window.closed = true;
                window.hard_deadline
            };
            *slot = Slot::Retired { hard_deadline };
            retired += 1;
        }
        if retired > 0 {
            debug!(retired, "Closed attempts retired");
        }
        retired
    }

    /// Number of live (not retired) attempts
    pub fn len(&self) -> usize {
        self.attempts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| matches!(slot, Slot::Live(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, attempt_id: &AttemptId) -> Result<Slot, Error> {
        self.attempts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(attempt_id)
            .cloned()
            .ok_or_else(|| Error::UnknownAttempt(attempt_id.clone()))
    }
}

// Mutations are single flag stores, so a poisoned window is still consistent.
fn lock(window: &Mutex<AttemptWindow>) -> MutexGuard<'_, AttemptWindow> {
    window.lock().unwrap_or_else(PoisonError::into_inner)
}
