/*!
 * Fairsync Library
 *
 * Small synchronization toolkit built around two independent primitives:
 *
 * - [`FairMutex`]: mutual exclusion granted strictly in FIFO arrival
 *   order, so no perpetually-retrying caller can starve an earlier one
 * - [`VersionedCell`]: lock-free optimistic updates guarded by a
 *   monotonic version, so A->B->A histories cannot fool a compare-and-swap
 *
 * The two compose freely but share no state; use either alone or a
 * `FairMutex` protecting a region that manipulates a `VersionedCell`.
 */

pub mod errors;
pub mod fair;
pub mod versioned;

// Re-exports
pub use errors::{AcquireError, AcquireResult, ReleaseError};
pub use fair::{FairGuard, FairMutex, FairMutexConfig, Ticket};
pub use versioned::{Snapshot, VersionedCell};
