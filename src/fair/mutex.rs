/*!
 * Fair Mutex
 *
 * Mutual exclusion with strict FIFO admission.
 *
 * # Design: Direct Hand-Off Over Re-Contention
 *
 * A conventional mutex reopens the race on every unlock, so a greedy
 * re-acquirer that sleeps briefly and comes back can beat a thread that has
 * been queued for seconds. Here the releaser never reopens the race: it
 * pops the head of the arrival queue and transfers ownership to that waiter
 * directly. `busy` stays true across the hand-off, so late arrivals keep
 * queuing behind the new owner and no ticket is ever skipped.
 *
 * Invariants:
 * - at most one ticket owns the critical section at a time
 * - grants happen in exactly arrival order
 * - `busy == false` implies the queue is empty
 */

use super::config::FairMutexConfig;
use super::waiter::{TicketId, WaitState, Waiter};
use crate::errors::{AcquireError, AcquireResult, ReleaseError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Proof of ownership returned by a successful acquire.
///
/// Consumed by [`FairMutex::release`]; tickets are neither cloneable nor
/// reusable, so double-release is unrepresentable.
#[derive(Debug)]
pub struct Ticket {
    id: TicketId,
}

impl Ticket {
    /// Ticket identity, unique per mutex (diagnostics only)
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Queue state behind the bookkeeping lock
struct Inner {
    /// Arrival-ordered waiters. Never reordered.
    waiters: VecDeque<Arc<Waiter>>,
    /// True from grant until the matching release (including hand-offs).
    busy: bool,
    /// Current holder, for misuse detection.
    owner: Option<TicketId>,
}

/// FIFO-fair mutual exclusion scheduler
///
/// # Examples
///
/// ```
/// use fairsync::FairMutex;
/// use std::time::Duration;
///
/// let mutex = FairMutex::new();
///
/// let ticket = mutex.acquire();
/// // ... critical section ...
/// mutex.release(ticket).unwrap();
///
/// // RAII flavor
/// {
///     let _guard = mutex.lock();
///     // ... critical section, released on drop ...
/// }
///
/// // Bounded wait
/// match mutex.lock_timeout(Duration::from_millis(10)) {
///     Ok(_guard) => { /* served within the deadline */ }
///     Err(e) => eprintln!("gave up: {e}"),
/// };
/// ```
pub struct FairMutex {
    inner: Mutex<Inner>,
    next_id: AtomicU64,
    config: FairMutexConfig,
}

impl FairMutex {
    /// Create an unlocked mutex with the default configuration
    pub fn new() -> Self {
        Self::with_config(FairMutexConfig::default())
    }

    /// Create an unlocked mutex with explicit wait-path tuning
    pub fn with_config(config: FairMutexConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                waiters: VecDeque::new(),
                busy: false,
                owner: None,
            }),
            next_id: AtomicU64::new(0),
            config,
        }
    }

    /// Acquire ownership, blocking until this caller reaches the head of
    /// the queue.
    ///
    /// Strictly FIFO: callers are served in the order their tickets were
    /// created, regardless of scheduler jitter.
    pub fn acquire(&self) -> Ticket {
        match self.acquire_inner(None) {
            Ok(ticket) => ticket,
            Err(_) => unreachable!("untimed acquire cannot time out"),
        }
    }

    /// Acquire ownership, giving up after `timeout`.
    ///
    /// On timeout the ticket is unlinked from the queue with no side
    /// effects. The cancellation is atomic with respect to a concurrent
    /// hand-off: a ticket is never both timed out and granted.
    pub fn acquire_timeout(&self, timeout: Duration) -> AcquireResult<Ticket> {
        self.acquire_inner(Some(Instant::now() + timeout))
    }

    /// Acquire only if the mutex is free right now
    pub fn try_acquire(&self) -> Option<Ticket> {
        let mut inner = self.inner.lock();
        if inner.busy {
            return None;
        }
        let id = self.mint_id();
        inner.busy = true;
        inner.owner = Some(id);
        trace!(ticket = id, "acquired uncontended");
        Some(Ticket { id })
    }

    /// Release ownership, handing the critical section to the next queued
    /// waiter if any.
    ///
    /// Fails with [`ReleaseError::NotOwner`] if `ticket` does not hold
    /// ownership; the critical section is left untouched in that case.
    pub fn release(&self, ticket: Ticket) -> Result<(), ReleaseError> {
        let mut inner = self.inner.lock();
        if inner.owner != Some(ticket.id) {
            warn!(ticket = ticket.id, "release without ownership");
            return Err(ReleaseError::NotOwner);
        }
        match inner.waiters.pop_front() {
            Some(next) => {
                // Direct transfer: busy stays true so nobody can slip in
                // between this release and the head waiter waking up.
                inner.owner = Some(next.id);
                trace!(from = ticket.id, to = next.id, "ownership handed off");
                next.grant();
            }
            None => {
                inner.busy = false;
                inner.owner = None;
                trace!(ticket = ticket.id, "released, queue empty");
            }
        }
        Ok(())
    }

    /// Acquire ownership and wrap it in an RAII guard
    pub fn lock(&self) -> FairGuard<'_> {
        FairGuard {
            mutex: self,
            ticket: Some(self.acquire()),
        }
    }

    /// Acquire with a deadline and wrap the ticket in an RAII guard
    pub fn lock_timeout(&self, timeout: Duration) -> AcquireResult<FairGuard<'_>> {
        let ticket = self.acquire_timeout(timeout)?;
        Ok(FairGuard {
            mutex: self,
            ticket: Some(ticket),
        })
    }

    /// Number of tickets currently queued (diagnostics)
    pub fn waiter_count(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    /// Whether the critical section is currently held
    pub fn is_locked(&self) -> bool {
        self.inner.lock().busy
    }

    #[inline]
    fn mint_id(&self) -> TicketId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn acquire_inner(&self, deadline: Option<Instant>) -> AcquireResult<Ticket> {
        let waiter = {
            let mut inner = self.inner.lock();
            if !inner.busy {
                // Fast path. busy == false implies the queue is empty, so
                // taking ownership here cannot skip an earlier arrival.
                debug_assert!(inner.waiters.is_empty());
                let id = self.mint_id();
                inner.busy = true;
                inner.owner = Some(id);
                trace!(ticket = id, "acquired uncontended");
                return Ok(Ticket { id });
            }
            let waiter = Arc::new(Waiter::new(self.mint_id()));
            inner.waiters.push_back(Arc::clone(&waiter));
            trace!(
                ticket = waiter.id,
                queue_depth = inner.waiters.len(),
                "enqueued"
            );
            waiter
        };

        let granted = match deadline {
            None => {
                waiter.park(self.config.spin_before_park);
                true
            }
            Some(deadline) => waiter.park_until(deadline, self.config.spin_before_park),
        };

        if granted {
            trace!(ticket = waiter.id, "granted ownership");
            return Ok(Ticket { id: waiter.id });
        }

        // Deadline elapsed while still `Waiting`. Re-take the bookkeeping
        // lock so cancellation and a concurrent hand-off cannot both win:
        // grants only happen under this lock.
        let mut inner = self.inner.lock();
        if waiter.state() == WaitState::Granted {
            // The hand-off landed between the timeout and this lock; the
            // grant stands and the deadline is not reported.
            trace!(ticket = waiter.id, "granted while cancelling");
            return Ok(Ticket { id: waiter.id });
        }
        if let Some(pos) = inner.waiters.iter().position(|w| w.id == waiter.id) {
            inner.waiters.remove(pos);
        }
        waiter.abandon();
        trace!(ticket = waiter.id, "acquire timed out");
        Err(AcquireError::Timeout)
    }
}

impl Default for FairMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FairMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("FairMutex")
            .field("busy", &inner.busy)
            .field("waiters", &inner.waiters.len())
            .finish()
    }
}

/// RAII ownership of a [`FairMutex`]; releases on drop
pub struct FairGuard<'a> {
    mutex: &'a FairMutex,
    ticket: Option<Ticket>,
}

impl FairGuard<'_> {
    /// Identity of the owning ticket (diagnostics only)
    pub fn ticket_id(&self) -> u64 {
        match &self.ticket {
            Some(ticket) => ticket.id(),
            None => unreachable!("guard without ticket"),
        }
    }
}

impl Drop for FairGuard<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            // The guard's ticket is the owner by construction.
            let _ = self.mutex.release(ticket);
        }
    }
}
