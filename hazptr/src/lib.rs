//! Hazard-pointer memory reclamation.
//!
//! Readers publish the addresses they are about to dereference into
//! per-thread hazard slots; writers that unlink a node [`retire`] it instead
//! of freeing it, and a retired node is freed only once no slot in the
//! process announces it. Between publishing a pointer and dereferencing it,
//! the reader must re-read the source link and check the node's invalidation
//! flag ([`HazardPointer::validate`]); a failed check means the protection
//! raced with an unlink and the traversal must restart from a safe anchor.

mod domain;
mod hazard;
mod retire;
mod tag;
mod thread;

pub use domain::{Domain, MAX_THREADS, SLOTS_PER_THREAD};
pub use hazard::HazardPointer;
pub use tag::*;

use core::cell::RefCell;
use std::thread_local;

use crate::thread::Thread;

/// Called on a retired object immediately before its storage is released.
///
/// List nodes flip their `deleted` flag here so that readers racing with
/// reclamation can detect a vacuous protection and restart.
pub trait Invalidate {
    fn invalidate(&self);
}

// Process-wide registry, constructed eagerly: a plain `static`, no lazy
// initialization involved.
static DOMAIN: Domain = Domain::new();

// NOTE: must not hand out raw pointers into the TLS block itself; only the
// `&'static` record reference may escape.
thread_local! {
    static THREAD: RefCell<Box<Thread<'static>>> = RefCell::new(Box::new(Thread::new(&DOMAIN)));
}

impl Default for HazardPointer<'static> {
    fn default() -> Self {
        THREAD.with(|t| HazardPointer::new(t.borrow().record()))
    }
}

/// Retire a pointer into the calling thread's private pending list.
///
/// Once the pending list reaches the reclamation threshold, entries not
/// named by any hazard slot are invalidated and freed.
///
/// # Safety
///
/// `ptr` must point to a live `Box`-allocated `T` that has been unlinked
/// from the shared structure, and no thread may retire the same pointer
/// twice.
#[inline]
pub unsafe fn retire<T: Invalidate>(ptr: *mut T) {
    THREAD.with(|t| t.borrow_mut().retire(ptr))
}

/// Whether any hazard slot of any registered thread currently names `ptr`.
///
/// Slots are scanned in no particular order; callers must not infer any
/// ordering from the result.
pub fn is_protected<T>(ptr: *mut T) -> bool {
    DOMAIN.is_protected(ptr as *mut u8)
}

/// Run a reclamation pass over the calling thread's pending list.
pub fn do_reclamation() {
    THREAD.with(|t| t.borrow_mut().do_reclamation())
}

/// Number of pointers currently pending in the calling thread's retired
/// list. Diagnostic, used to bound reclaimer backlog in tests.
pub fn retired_count() -> usize {
    THREAD.with(|t| t.borrow().retired_count())
}

/// Number of threads currently holding a registry record. Diagnostic.
pub fn active_threads() -> usize {
    DOMAIN.active_threads()
}
