/*!
 * Version-Guarded Optimistic Updates
 *
 * Lock-free container whose compare-and-swap checks a monotonic version
 * alongside the value, making every mutation observably distinct even when
 * the payload coincidentally repeats (the ABA hazard).
 */

mod cell;

pub use cell::{Snapshot, VersionedCell};
