use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::hazard::ThreadRecord;

/// Capacity of the registry. Must be at least the maximum number of threads
/// that concurrently operate on any list; claiming a record beyond this is a
/// fatal configuration error.
pub const MAX_THREADS: usize = 256;

/// Hazard slots per thread record. The list walk holds at most four nodes at
/// once and `remove` a fifth.
pub const SLOTS_PER_THREAD: usize = 5;

/// Fixed-capacity registry of per-thread hazard records.
pub struct Domain {
    records: [ThreadRecord; MAX_THREADS],
    active: AtomicUsize,
}

impl Domain {
    pub const fn new() -> Self {
        Self {
            records: [const { ThreadRecord::new() }; MAX_THREADS],
            active: AtomicUsize::new(0),
        }
    }

    /// Claim a record for the calling thread. The record is retained until
    /// the thread's [`crate::Thread`] handle drops.
    pub(crate) fn acquire(&self) -> &ThreadRecord {
        for record in &self.records {
            if record.try_claim() {
                self.active.fetch_add(1, Ordering::Relaxed);
                return record;
            }
        }
        panic!("hazard-pointer registry is full ({MAX_THREADS} records); raise MAX_THREADS");
    }

    pub(crate) fn release(&self, record: &ThreadRecord) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        record.unclaim();
    }

    /// Threads currently holding a record. Feeds the reclamation threshold.
    pub(crate) fn active_threads(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Acquire-load every slot of every claimed record and test `ptr`
    /// against them.
    pub fn is_protected(&self, ptr: *mut u8) -> bool {
        self.records
            .iter()
            .filter(|r| r.is_claimed())
            .any(|r| r.slots().any(|slot| slot == ptr))
    }

    /// Snapshot of every announced pointer, for partitioning a pending list.
    pub(crate) fn collect_guarded_ptrs(&self) -> HashSet<*mut u8> {
        self.records
            .iter()
            .filter(|r| r.is_claimed())
            .flat_map(|r| r.slots())
            .filter(|p| !p.is_null())
            .collect()
    }
}
