/*!
 * Versioned Cell
 *
 * Optimistic-concurrency container for lock-free read-modify-write.
 *
 * # Design: Pointer-Plus-Stamp Over Wide CAS
 *
 * The value and its version must change as one indivisible unit; updating
 * them as two separate atomics reintroduces the race the version exists to
 * close. Rather than a 128-bit hardware CAS (which would restrict `T`),
 * each generation lives in its own immutable allocation behind an atomic
 * pointer swap. Pointer identity then coincides exactly with one
 * `(value, version)` pair:
 *
 * **Read path** (lock-free, wait-free): one atomic pointer load.
 *
 * **Write path** (lock-free): load, check value and version against the
 * caller's expectation, then pointer-compare-and-swap a freshly allocated
 * generation in. A lost race leaves the cell untouched.
 *
 * A plain value-equality CAS cannot distinguish A→B→A from "nothing
 * happened"; the version increments on every successful swap, so a stale
 * expectation always fails even when the payload looks identical.
 */

use arc_swap::ArcSwap;
use std::sync::Arc;
use tracing::trace;

/// One immutable (value, version) generation
struct Stamped<T> {
    value: T,
    version: u64,
}

/// Atomic snapshot of a cell: the value together with the version it was
/// read at.
///
/// Holding a snapshot keeps its generation alive, so the borrowed value
/// can never be freed out from under the reader.
pub struct Snapshot<T> {
    stamped: Arc<Stamped<T>>,
}

impl<T> Snapshot<T> {
    /// The observed value
    #[inline]
    pub fn value(&self) -> &T {
        &self.stamped.value
    }

    /// The version the value was observed at
    #[inline]
    pub fn version(&self) -> u64 {
        self.stamped.version
    }
}

impl<T: Clone> Snapshot<T> {
    /// Extract an owned `(value, version)` pair
    pub fn into_pair(self) -> (T, u64) {
        (self.stamped.value.clone(), self.stamped.version)
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            stamped: Arc::clone(&self.stamped),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("value", &self.stamped.value)
            .field("version", &self.stamped.version)
            .finish()
    }
}

/// Lock-free cell with a version-checked compare-and-swap
///
/// The version starts at 0 and increments by exactly 1 on every successful
/// swap; the version sequence is a total order over all mutations.
///
/// # Examples
///
/// ```
/// use fairsync::VersionedCell;
///
/// let cell = VersionedCell::new("A");
///
/// let snap = cell.snapshot();
/// assert_eq!((*snap.value(), snap.version()), ("A", 0));
///
/// // Succeeds: value and version both match
/// assert!(cell.compare_and_swap(&"A", 0, "B"));
///
/// // Fails: the snapshot is stale, even though nothing blocks
/// assert!(!cell.compare_and_swap(&"A", 0, "Z"));
/// assert_eq!(cell.version(), 1);
/// ```
pub struct VersionedCell<T> {
    stamped: ArcSwap<Stamped<T>>,
}

impl<T> VersionedCell<T> {
    /// Create a cell holding `initial` at version 0
    pub fn new(initial: T) -> Self {
        Self {
            stamped: ArcSwap::from_pointee(Stamped {
                value: initial,
                version: 0,
            }),
        }
    }

    /// Atomically observe the current `(value, version)` pair.
    ///
    /// Never blocks, never fails; one atomic pointer load.
    #[inline]
    pub fn snapshot(&self) -> Snapshot<T> {
        Snapshot {
            stamped: self.stamped.load_full(),
        }
    }

    /// Current version (single atomic load)
    #[inline]
    pub fn version(&self) -> u64 {
        self.stamped.load().version
    }
}

impl<T: Clone> VersionedCell<T> {
    /// Clone out the current value (single atomic load)
    #[inline]
    pub fn load(&self) -> T {
        self.stamped.load().value.clone()
    }
}

impl<T: PartialEq> VersionedCell<T> {
    /// Replace the value iff the cell still holds exactly
    /// `(expected, expected_version)`.
    ///
    /// On success the version increments by exactly 1 and the method
    /// returns true. On any mismatch, or on losing the race to a concurrent
    /// swap, the cell is untouched and the method returns false.
    ///
    /// Never retries internally: a false return means the caller must
    /// re-[`snapshot`](VersionedCell::snapshot) and recompute its new value
    /// from fresh state. Retry policy belongs to the caller.
    pub fn compare_and_swap(&self, expected: &T, expected_version: u64, new: T) -> bool {
        let current = self.stamped.load();
        if current.version != expected_version || current.value != *expected {
            trace!(
                expected_version,
                current_version = current.version,
                "cas rejected, stale expectation"
            );
            return false;
        }

        let next = Arc::new(Stamped {
            value: new,
            version: expected_version + 1,
        });
        // Pointer CAS against the generation we just validated. If another
        // swap landed in between, the pointer differs and the attempt fails
        // without touching the cell; the version check above can never
        // falsely pass for that interleaving because versions only grow.
        let prev = self.stamped.compare_and_swap(&*current, next);
        let swapped = Arc::ptr_eq(&*prev, &*current);
        if swapped {
            trace!(version = expected_version + 1, "cas succeeded");
        } else {
            trace!(expected_version, "cas lost the race");
        }
        swapped
    }
}

impl<T: Default> Default for VersionedCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for VersionedCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.stamped.load();
        f.debug_struct("VersionedCell")
            .field("value", &current.value)
            .field("version", &current.version)
            .finish()
    }
}
