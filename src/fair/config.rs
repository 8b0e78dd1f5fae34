/*!
 * Fair Mutex Configuration
 *
 * Runtime tuning for the wait path
 */

/// Tuning knobs for how a waiter behaves between enqueue and grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FairMutexConfig {
    /// Spin briefly (adaptive backoff) before parking on the signal.
    ///
    /// Helps when critical sections are short (< ~10µs); wasted work when
    /// holders routinely sleep or block.
    pub spin_before_park: bool,
}

impl Default for FairMutexConfig {
    fn default() -> Self {
        Self {
            spin_before_park: true,
        }
    }
}

impl FairMutexConfig {
    /// Configuration optimized for short critical sections (< 1ms hold)
    pub const fn low_latency() -> Self {
        Self {
            spin_before_park: true,
        }
    }

    /// Configuration optimized for long holds (> 1ms): park immediately
    pub const fn long_wait() -> Self {
        Self {
            spin_before_park: false,
        }
    }
}
