/*!
 * Per-Ticket Wait Signal
 *
 * One mutex+condvar pair per queued ticket, so a grant wakes exactly the
 * head of the queue and nobody else. Sharing a condvar across waiters
 * would reintroduce the herd race that fairness is meant to remove.
 */

use crossbeam_utils::Backoff;
use parking_lot::{Condvar, Mutex};
use std::time::Instant;

/// Unique identity of a queued acquire request
pub(crate) type TicketId = u64;

/// Lifecycle of a queued waiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitState {
    /// In the queue, not yet served.
    Waiting,
    /// Ownership has been transferred to this waiter.
    Granted,
    /// Timed out and unlinked; must never be granted.
    Abandoned,
}

/// A single queued waiter: the binary signal the releaser fires to hand
/// ownership over.
///
/// Lock ordering: on every path that takes both, the owning queue's
/// bookkeeping lock is taken first and `state` nests inside it.
pub(crate) struct Waiter {
    pub(crate) id: TicketId,
    state: Mutex<WaitState>,
    signal: Condvar,
}

impl Waiter {
    pub(crate) fn new(id: TicketId) -> Self {
        Self {
            id,
            state: Mutex::new(WaitState::Waiting),
            signal: Condvar::new(),
        }
    }

    /// Current state without blocking (spin-phase check)
    #[inline]
    pub(crate) fn state(&self) -> WaitState {
        *self.state.lock()
    }

    /// Mark this waiter granted and wake it.
    ///
    /// Must be called with the bookkeeping lock held, after the waiter has
    /// been popped from the queue.
    pub(crate) fn grant(&self) {
        let mut state = self.state.lock();
        *state = WaitState::Granted;
        self.signal.notify_one();
    }

    /// Mark this waiter abandoned.
    ///
    /// Must be called with the bookkeeping lock held, after the waiter has
    /// been unlinked from the queue.
    pub(crate) fn abandon(&self) {
        *self.state.lock() = WaitState::Abandoned;
    }

    /// Block until granted.
    ///
    /// Spins with adaptive backoff first (when enabled), then parks on the
    /// signal. Spurious wakeups re-check the state.
    pub(crate) fn park(&self, spin: bool) {
        if spin && self.spin_for_grant() {
            return;
        }
        let mut state = self.state.lock();
        while *state != WaitState::Granted {
            self.signal.wait(&mut state);
        }
    }

    /// Block until granted or `deadline` passes.
    ///
    /// Returns true if granted. A false return means the deadline elapsed
    /// while still `Waiting`; the caller must then resolve the race against
    /// a concurrent hand-off under the bookkeeping lock.
    pub(crate) fn park_until(&self, deadline: Instant, spin: bool) -> bool {
        if spin && self.spin_for_grant() {
            return true;
        }
        let mut state = self.state.lock();
        while *state != WaitState::Granted {
            if Instant::now() >= deadline {
                return false;
            }
            if self.signal.wait_until(&mut state, deadline).timed_out() {
                return *state == WaitState::Granted;
            }
        }
        true
    }

    /// Bounded spin phase. Returns true if the grant landed while spinning.
    fn spin_for_grant(&self) -> bool {
        let backoff = Backoff::new();
        while !backoff.is_completed() {
            if self.state() == WaitState::Granted {
                return true;
            }
            backoff.snooze();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_grant_wakes_parked_waiter() {
        let waiter = Arc::new(Waiter::new(1));
        let waiter_clone = waiter.clone();

        let handle = thread::spawn(move || waiter_clone.park(false));

        thread::sleep(Duration::from_millis(50));
        waiter.grant();

        handle.join().unwrap();
        assert_eq!(waiter.state(), WaitState::Granted);
    }

    #[test]
    fn test_park_until_times_out() {
        let waiter = Waiter::new(2);
        let start = Instant::now();

        let granted = waiter.park_until(Instant::now() + Duration::from_millis(50), false);

        assert!(!granted);
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(waiter.state(), WaitState::Waiting);
    }

    #[test]
    fn test_grant_before_park_returns_immediately() {
        let waiter = Waiter::new(3);
        waiter.grant();

        // Already granted: both paths return without blocking
        waiter.park(true);
        assert!(waiter.park_until(Instant::now() + Duration::from_millis(10), true));
    }
}
