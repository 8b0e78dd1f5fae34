/*!
 * Error Types
 * Centralized error handling with thiserror
 */

use thiserror::Error;

/// Result type for acquire operations
pub type AcquireResult<T> = Result<T, AcquireError>;

/// Failures of a blocking acquire
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    /// The deadline elapsed before ownership was granted.
    ///
    /// Recoverable: the ticket has been unlinked from the queue with no
    /// side effects, so the caller may retry or abandon.
    #[error("acquire timed out before ownership was granted")]
    Timeout,
}

/// Failures of a release
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseError {
    /// The releasing ticket does not hold ownership.
    ///
    /// Indicates API misuse, not a runtime race; the critical section is
    /// left untouched.
    #[error("release called by a ticket that does not hold ownership")]
    NotOwner,
}
