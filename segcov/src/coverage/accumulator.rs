//! Coverage accumulation between dumps
//!
//! One mutex guards both the touched set and the dump counter. Recording an
//! entry and taking a dump therefore serialize: an address recorded
//! concurrently with a dump lands either in that dump or in the next one,
//! never in both and never in neither.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{Address, DumpNumber};

#[derive(Debug, Default)]
struct SegmentState {
    touched: HashSet<Address>,
    last_dump: DumpNumber,
}

/// Set of functions executed since the last dump, shared by all threads
#[derive(Debug, Default)]
pub struct CoverageAccumulator {
    state: Mutex<SegmentState>,
}

/// An in-progress dump
///
/// Holds the accumulator lock until dropped, so no entry can be recorded
/// while the segment is being written out.
pub struct SegmentDump<'a> {
    _guard: MutexGuard<'a, SegmentState>,
    pub number: DumpNumber,
    pub addresses: HashSet<Address>,
}

impl CoverageAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SegmentState> {
        // A panic elsewhere must not stop coverage collection in the target
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that the function at `addr` executed (idempotent)
    pub fn record_entry(&self, addr: Address) {
        self.lock().touched.insert(addr);
    }

    /// Take the current segment's addresses and start an empty one
    pub fn drain_and_reset(&self) -> HashSet<Address> {
        std::mem::take(&mut self.lock().touched)
    }

    /// Increment the dump counter and drain the segment as one atomic step
    pub fn begin_dump(&self) -> SegmentDump<'_> {
        let mut guard = self.lock();
        guard.last_dump = guard.last_dump.next();
        let number = guard.last_dump;
        let addresses = std::mem::take(&mut guard.touched);
        SegmentDump { _guard: guard, number, addresses }
    }

    /// Number of distinct functions recorded since the last dump
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().touched.len()
    }

    /// Number of the most recent dump (0 before the first one)
    #[must_use]
    pub fn last_dump(&self) -> DumpNumber {
        self.lock().last_dump
    }
}
