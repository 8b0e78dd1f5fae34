/*!
 * Fair Mutual Exclusion
 *
 * Queue-based admission scheduler that grants a critical section strictly
 * in FIFO arrival order, eliminating starvation under contention.
 *
 * # Architecture
 *
 * A short-lived bookkeeping lock guards an arrival-ordered queue of
 * waiters; each waiter parks on its own private signal until the releaser
 * hands ownership over. The bookkeeping lock is held only for O(1) queue
 * mutations, never across a park.
 *
 * # Use Cases
 *
 * - **Mixed workloads**: one slow "patient" caller among many greedy
 *   re-acquirers still gets served in turn
 * - **Latency fairness**: tail latency bounded by queue position instead
 *   of contention luck
 */

mod config;
mod mutex;
mod waiter;

pub use config::FairMutexConfig;
pub use mutex::{FairGuard, FairMutex, Ticket};
