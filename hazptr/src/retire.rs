use crate::Invalidate;

/// A pointer awaiting reclamation, with its type-erased invalidation and
/// deallocation routines captured at retirement time.
#[derive(Clone, Copy)]
pub(crate) struct Retired {
    pub(crate) ptr: *mut u8,
    invalidater: unsafe fn(*mut u8),
    deleter: unsafe fn(*mut u8),
}

// Retired pointers never leave the retiring thread, but the containing
// `Thread` lives in a `thread_local` that the runtime may drop on another
// thread's stack during teardown.
unsafe impl Send for Retired {}

impl Retired {
    pub(crate) fn new<T: Invalidate>(ptr: *mut T) -> Self {
        Self {
            ptr: ptr as *mut u8,
            invalidater: invalidate::<T>,
            deleter: free::<T>,
        }
    }

    /// Flag the object as freed, then release its storage.
    ///
    /// # Safety
    ///
    /// No hazard slot may name `self.ptr`, and this must be the only
    /// `Retired` entry holding it.
    pub(crate) unsafe fn reclaim(self) {
        (self.invalidater)(self.ptr);
        (self.deleter)(self.ptr);
    }
}

unsafe fn free<T>(ptr: *mut u8) {
    drop(Box::from_raw(ptr as *mut T))
}

unsafe fn invalidate<T: Invalidate>(ptr: *mut u8) {
    T::invalidate(&*(ptr as *mut T))
}
