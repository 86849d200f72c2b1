//! Consensus-defined constants and the clock/ordering primitives built on them.
//!
//! Everything here must be compile-time baked (spec.md §6): changing one of
//! these constants changes what the network as a whole accepts, so they are
//! not configuration.

/// Seconds since the consensus epoch. The epoch itself is a deployment
/// choice left to the caller; the store only ever compares two timestamps.
pub type Timestamp = u32;

/// Entries older than `now() - MAX_AGE` are rejected (spec.md §4.C, rule 5).
/// `2^30` seconds is about 34 years.
pub const MAX_AGE: u32 = 1 << 30;

/// Entries timestamped more than this far in the future are rejected
/// (spec.md §4.C, rule 6). Five minutes of clock skew tolerance.
pub const MAX_SKEW: u32 = 5 * 60;

/// Inclusive lower bound on proof length, in bytes. Always even.
pub const PROOF_MIN_LEN: usize = 8;

/// Inclusive upper bound on proof length, in bytes. Always even.
pub const PROOF_MAX_LEN: usize = 256;

/// Minimum number of leading zero bits a proof's work digest must have.
pub const PROOF_MIN_COMPLEXITY: u32 = 20;

/// Cap on content bytes following the fixed entry header (id+parent+signature).
pub const MAX_CONTENT_SIZE: usize = 1 << 20;

/// `sizeof` the fixed entry header: id(32) + parent(32) + signature(64).
pub const ENTRY_HEADER_SIZE: usize = 32 + 32 + 64;

/// Minimum total size of a valid entry on the wire: header + a proof of at
/// least `PROOF_MIN_LEN` bytes (spec.md §4.C, rule 1).
pub const MIN_VALIDATED_ENTRY_SIZE: usize = ENTRY_HEADER_SIZE + PROOF_MIN_LEN;

/// A pure accessor for "now" in consensus-clock seconds. Injected everywhere
/// rather than called directly, so tests can hold time fixed (spec.md §9,
/// "Global `now()`").
pub trait Clock: Send + Sync {
    /// Current consensus-clock time, in seconds since the epoch.
    fn now(&self) -> Timestamp;
}

/// The real wall clock, backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as Timestamp)
            .unwrap_or(0)
    }
}

/// A clock that always reports a fixed instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Consensus-defined total order on timestamps: `older(t1, t2)` is true iff
/// `t1` strictly precedes `t2` on the fixed epoch. This is plain `u32`
/// comparison — the indirection exists so call sites read the same as
/// spec.md's invariant language (`id.timestamp ≥ parent.timestamp`, etc.)
/// and so a future consensus change (e.g. wraparound handling) has one
/// place to land.
#[inline]
pub fn older(t1: Timestamp, t2: Timestamp) -> bool {
    t1 < t2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn older_is_strict_precedence() {
        assert!(older(10, 20));
        assert!(!older(20, 10));
        assert!(!older(10, 10));
    }

    #[test]
    fn fixed_clock_reports_fixed_instant() {
        let clock = FixedClock(1_700_000_000);
        assert_eq!(clock.now(), 1_700_000_000);
    }
}
