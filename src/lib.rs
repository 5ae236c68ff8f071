//! A concurrent ordered set of keys over a singly-linked list: lock-free
//! insert / remove / find with two-step logical-then-physical deletion and
//! hazard-pointer reclamation, an experimental pointer-tag variant, and a
//! coarse-grained mutex baseline for comparison.

cfg_if::cfg_if! {
    if #[cfg(all(not(feature = "sanitize"), target_os = "linux"))] {
        #[global_allocator]
        static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;
    }
}

pub mod coarse;
pub mod concurrent_set;
pub mod list;
pub mod tagged;

pub use coarse::CoarseList;
pub use concurrent_set::ConcurrentSet;
pub use list::List;
pub use tagged::TaggedList;
