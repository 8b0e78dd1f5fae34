/*!
 * Versioned Cell Integration Tests
 *
 * CAS semantics, ABA resistance, and retry-loop convergence under real
 * thread contention
 */

use fairsync::{FairMutex, VersionedCell};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

#[test]
fn test_stale_snapshot_scenario() {
    // ("A",0) -> ("B",1) -> ("C",2), then a stale attempt
    let cell = VersionedCell::new("A");

    assert!(cell.compare_and_swap(&"A", 0, "B"));
    assert_eq!((cell.load(), cell.version()), ("B", 1));

    assert!(cell.compare_and_swap(&"B", 1, "C"));
    assert_eq!((cell.load(), cell.version()), ("C", 2));

    // Stale (A, 0) expectation: rejected, state untouched
    assert!(!cell.compare_and_swap(&"A", 0, "Z"));
    assert_eq!((cell.load(), cell.version()), ("C", 2));
}

#[test]
fn test_aba_cycle_is_detected() {
    let cell = VersionedCell::new("A");

    // A reader takes a snapshot at ("A", 0)...
    let stale = cell.snapshot();

    // ...while three interfering swaps cycle the value back to "A"
    assert!(cell.compare_and_swap(&"A", 0, "B"));
    assert!(cell.compare_and_swap(&"B", 1, "C"));
    assert!(cell.compare_and_swap(&"C", 2, "A"));
    assert_eq!((cell.load(), cell.version()), ("A", 3));

    // Equal value, different history: the stale CAS must fail
    assert!(!cell.compare_and_swap(stale.value(), stale.version(), "Z"));
    assert_eq!((cell.load(), cell.version()), ("A", 3));
}

#[test]
fn test_concurrent_retry_loops_converge() {
    let cell = Arc::new(VersionedCell::new(0u64));
    let threads = 8u64;
    let iters = 500u64;

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let cell_clone = Arc::clone(&cell);
            thread::spawn(move || {
                for _ in 0..iters {
                    // Caller-owned retry: re-snapshot and recompute on failure
                    loop {
                        let snap = cell_clone.snapshot();
                        if cell_clone.compare_and_swap(
                            snap.value(),
                            snap.version(),
                            snap.value() + 1,
                        ) {
                            break;
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Every successful CAS incremented both value and version exactly once
    assert_eq!(cell.load(), threads * iters);
    assert_eq!(cell.version(), threads * iters);
}

#[test]
fn test_snapshot_is_internally_consistent_under_writers() {
    // Writers keep value == version at every generation; any torn read
    // would surface as a snapshot where they disagree.
    let cell = Arc::new(VersionedCell::new(0u64));
    let writer = {
        let cell_clone = Arc::clone(&cell);
        thread::spawn(move || {
            for _ in 0..10_000 {
                loop {
                    let snap = cell_clone.snapshot();
                    if cell_clone.compare_and_swap(
                        snap.value(),
                        snap.version(),
                        snap.value() + 1,
                    ) {
                        break;
                    }
                }
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cell_clone = Arc::clone(&cell);
            thread::spawn(move || {
                for _ in 0..10_000 {
                    let snap = cell_clone.snapshot();
                    assert_eq!(*snap.value(), snap.version());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}

#[test]
fn test_fair_mutex_protecting_versioned_region() {
    // The two primitives compose without sharing state: a fair critical
    // section whose body manipulates the cell optimistically.
    let mutex = Arc::new(FairMutex::new());
    let cell = Arc::new(VersionedCell::new(0u32));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let mutex_clone = Arc::clone(&mutex);
            let cell_clone = Arc::clone(&cell);
            thread::spawn(move || {
                for _ in 0..50 {
                    let _guard = mutex_clone.lock();
                    let snap = cell_clone.snapshot();
                    // Serialized by the mutex, so the CAS cannot lose
                    assert!(cell_clone.compare_and_swap(
                        snap.value(),
                        snap.version(),
                        snap.value() + 1,
                    ));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cell.load(), 200);
    assert_eq!(cell.version(), 200);
}

proptest! {
    /// The version counts successful swaps exactly; failures are no-ops.
    #[test]
    fn prop_version_tracks_successful_swaps(
        ops in proptest::collection::vec(any::<(bool, u8)>(), 1..64)
    ) {
        let cell = VersionedCell::new(0u8);
        let mut model_value = 0u8;
        let mut model_version = 0u64;

        for (stale, new_value) in ops {
            if stale {
                // Wrong version with the right value: the ABA shape
                let ok = cell.compare_and_swap(&model_value, model_version + 1, new_value);
                prop_assert!(!ok);
            } else {
                let ok = cell.compare_and_swap(&model_value, model_version, new_value);
                prop_assert!(ok);
                model_value = new_value;
                model_version += 1;
            }
            prop_assert_eq!(cell.load(), model_value);
            prop_assert_eq!(cell.version(), model_version);
        }
    }

    /// A snapshot taken at any point stays frozen regardless of later swaps.
    #[test]
    fn prop_snapshot_immutable_after_swaps(values in proptest::collection::vec(any::<u8>(), 1..16)) {
        let cell = VersionedCell::new(0u8);
        let snap = cell.snapshot();

        let mut current = 0u8;
        let mut version = 0u64;
        for value in values {
            prop_assert!(cell.compare_and_swap(&current, version, value));
            current = value;
            version += 1;
        }

        prop_assert_eq!(*snap.value(), 0);
        prop_assert_eq!(snap.version(), 0);
    }
}
