//! Lock-free ordered set over a singly-linked list, with two-step
//! logical-then-physical deletion and hazard-pointer reclamation.

use core::fmt::Debug;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use hazptr::{HazardPointer, Invalidate};

/// List node. `key` is set once at construction; `next` moves only by CAS,
/// `marked` flips false→true exactly once (logical delete), `deleted` is
/// flipped by the reclaimer just before the storage is released.
pub struct Node<K> {
    key: K,
    next: AtomicPtr<Node<K>>,
    marked: AtomicBool,
    deleted: AtomicBool,
}

impl<K> Node<K> {
    fn new(key: K) -> Self {
        Self {
            key,
            next: AtomicPtr::new(core::ptr::null_mut()),
            marked: AtomicBool::new(false),
            deleted: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn is_marked(&self) -> bool {
        self.marked.load(Ordering::Acquire)
    }

    fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }
}

impl<K> Invalidate for Node<K> {
    fn invalidate(&self) {
        let freed_before = self.deleted.swap(true, Ordering::Release);
        debug_assert!(!freed_before, "node reclaimed twice");
    }
}

/// The five hazard slots one operation needs: the walk pair, the freshly
/// loaded successor before slot rotation, the left anchor, and the
/// successor snapshot taken by `remove`.
struct Handle<'domain> {
    curr_h: HazardPointer<'domain>,
    next_h: HazardPointer<'domain>,
    succ_h: HazardPointer<'domain>,
    left_h: HazardPointer<'domain>,
    target_h: HazardPointer<'domain>,
}

impl Default for Handle<'static> {
    fn default() -> Self {
        Self {
            curr_h: HazardPointer::default(),
            next_h: HazardPointer::default(),
            succ_h: HazardPointer::default(),
            left_h: HazardPointer::default(),
            target_h: HazardPointer::default(),
        }
    }
}

/// An adjacent pair with `left.key < key <= right.key` that was linked
/// (`left.next == right`) at some instant during the search, both protected
/// by the caller's handle.
struct Search<K> {
    left: *mut Node<K>,
    right: *mut Node<K>,
}

struct Retry;

/// Concurrent sorted set of keys. `HEAD` and `TAIL` sentinels carry
/// `K::default()` and are never compared against real keys.
pub struct List<K> {
    head: *mut Node<K>,
    tail: *mut Node<K>,
}

unsafe impl<K: Send> Send for List<K> {}
unsafe impl<K: Send + Sync> Sync for List<K> {}

impl<K: Default> Default for List<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Default> List<K> {
    pub fn new() -> Self {
        let tail = Box::into_raw(Box::new(Node::new(K::default())));
        let head = Box::into_raw(Box::new(Node::new(K::default())));
        unsafe { &*head }.next.store(tail, Ordering::Release);
        Self { head, tail }
    }
}

impl<K: Ord> List<K> {
    /// One traversal attempt. `Err(Retry)` means a validation failed or a
    /// CAS was lost and the caller must restart from `HEAD`.
    fn try_search(&self, key: &K, handle: &mut Handle<'_>) -> Result<Search<K>, Retry> {
        let mut t = self.head;
        handle.curr_h.protect_raw(t);
        let mut t_next = unsafe { &*t }.next.load(Ordering::Acquire);
        handle.next_h.protect_raw(t_next);
        membarrier::light();
        if unsafe { &*t }.next.load(Ordering::Acquire) != t_next
            || unsafe { &*t }.is_deleted()
            || unsafe { &*t_next }.is_deleted()
        {
            return Err(Retry);
        }

        // HEAD is unmarked by construction, so it is always a valid anchor.
        let mut left = t;
        let mut left_next = t_next;
        handle.left_h.protect_raw(left);

        // Walk: stop at TAIL or at the first unmarked node with key >= key.
        loop {
            if !unsafe { &*t }.is_marked() {
                left = t;
                left_next = t_next;
                // `left` stays covered by curr_h while the copy lands.
                handle.left_h.protect_raw(left);
                membarrier::light();
                if unsafe { &*left }.is_deleted() {
                    return Err(Retry);
                }
            }

            t = t_next;
            if t == self.tail {
                break;
            }

            let succ = unsafe { &*t }.next.load(Ordering::Acquire);
            handle.succ_h.protect_raw(succ);
            membarrier::light();
            // The link may have been swung (or the nodes reclaimed) between
            // the load and the publication; any of it voids the protection.
            if unsafe { &*t }.next.load(Ordering::Acquire) != succ
                || unsafe { &*t }.is_deleted()
                || unsafe { &*succ }.is_deleted()
            {
                return Err(Retry);
            }
            t_next = succ;

            // Rotate the slots: each pointer is re-published before the slot
            // that covered it is overwritten.
            handle.curr_h.protect_raw(t);
            handle.next_h.protect_raw(t_next);

            let t_ref = unsafe { &*t };
            if !t_ref.is_marked() && t_ref.key >= *key {
                break;
            }
        }
        let right = t;

        if left_next == right {
            if right != self.tail && unsafe { &*right }.is_marked() {
                return Err(Retry);
            }
            return Ok(Search { left, right });
        }

        // Splice the run of marked nodes [left_next, right) out in one CAS,
        // then retire every node of the run.
        if unsafe { &*left }
            .next
            .compare_exchange(left_next, right, Ordering::Release, Ordering::Relaxed)
            .is_ok()
        {
            let mut node = left_next;
            while node != right {
                let succ = unsafe { &*node }.next.load(Ordering::Acquire);
                unsafe { hazptr::retire(node) };
                node = succ;
            }
            if right != self.tail && unsafe { &*right }.is_marked() {
                return Err(Retry);
            }
            return Ok(Search { left, right });
        }
        Err(Retry)
    }

    fn search(&self, key: &K, handle: &mut Handle<'_>) -> Search<K> {
        loop {
            if let Ok(found) = self.try_search(key, handle) {
                return found;
            }
        }
    }

    /// Insert `key`. Returns `true` iff the key was absent and is now a
    /// member. Linearizes at the successful link CAS.
    pub fn insert(&self, key: K) -> bool {
        let mut handle = Handle::default();
        let node = Box::into_raw(Box::new(Node::new(key)));
        loop {
            let Search { left, right } = self.search(unsafe { &(*node).key }, &mut handle);
            if right != self.tail && unsafe { &*right }.key == unsafe { &*node }.key {
                drop(unsafe { Box::from_raw(node) });
                return false;
            }

            // Not yet published; the CAS below is the release point.
            unsafe { &*node }.next.store(right, Ordering::Relaxed);
            if unsafe { &*left }
                .next
                .compare_exchange(right, node, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Remove `key`. Returns `true` iff this call transitioned the key out
    /// of the set. Linearizes at the successful mark CAS.
    pub fn remove(&self, key: K) -> bool {
        let mut handle = Handle::default();
        loop {
            let Search { left, right } = self.search(&key, &mut handle);
            if right == self.tail || unsafe { &*right }.key != key {
                return false;
            }

            let right_ref = unsafe { &*right };
            let right_next = right_ref.next.load(Ordering::Acquire);
            handle.target_h.protect_raw(right_next);
            membarrier::light();
            if right_ref.next.load(Ordering::Acquire) != right_next || right_ref.is_deleted() {
                continue;
            }

            if right_ref
                .marked
                .compare_exchange(false, true, Ordering::Release, Ordering::Relaxed)
                .is_err()
            {
                // Another thread owns the logical delete and reports it.
                continue;
            }

            // Best-effort physical unlink; on failure a later search snips
            // the node out and retires it.
            if unsafe { &*left }
                .next
                .compare_exchange(right, right_next, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                unsafe { hazptr::retire(right) };
            }
            return true;
        }
    }

    /// Whether a live node with `key` exists. Linearizes at the search's
    /// last validated read of `right`.
    pub fn find(&self, key: K) -> bool {
        let mut handle = Handle::default();
        let Search { right, .. } = self.search(&key, &mut handle);
        right != self.tail && unsafe { &*right }.key == key
    }
}

impl<K> List<K> {
    /// `HEAD` sentinel. Diagnostic.
    pub fn head(&self) -> *const Node<K> {
        self.head
    }

    /// `TAIL` sentinel. Diagnostic.
    pub fn tail(&self) -> *const Node<K> {
        self.tail
    }

    /// First node after `HEAD` (equal to `TAIL` when empty). Diagnostic.
    pub fn front(&self) -> *const Node<K> {
        unsafe { &*self.head }.next.load(Ordering::Acquire)
    }

    /// Successor of `node`. Diagnostic.
    ///
    /// # Safety
    ///
    /// `node` must be a node of this list that is still reachable; callers
    /// walk only at quiescent moments.
    pub unsafe fn next(&self, node: *const Node<K>) -> *const Node<K> {
        (*node).next.load(Ordering::Acquire)
    }

    /// Walk the unmarked keys in order. Requires `&mut self`: exclusive
    /// access is the quiescence the walk needs.
    pub fn iter(&mut self) -> Iter<'_, K> {
        Iter {
            curr: self.front(),
            tail: self.tail,
            _marker: PhantomData,
        }
    }

    /// Dump the live keys to stdout. Diagnostic.
    pub fn print(&mut self)
    where
        K: Debug,
    {
        let mut line = String::new();
        for key in self.iter() {
            line.push_str(&format!("{key:?} -> "));
        }
        println!("{line}NULL");
    }
}

impl<K> Drop for List<K> {
    fn drop(&mut self) {
        // Nodes still linked (sentinels included) are freed here; nodes
        // already unlinked sit in per-thread pending lists and are freed by
        // the reclaimer.
        let mut curr = self.head;
        while !curr.is_null() {
            let node = unsafe { Box::from_raw(curr) };
            curr = node.next.load(Ordering::Relaxed);
        }
    }
}

/// Quiescent iterator over live keys, obtained from [`List::iter`].
pub struct Iter<'a, K> {
    curr: *const Node<K>,
    tail: *const Node<K>,
    _marker: PhantomData<&'a List<K>>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        while self.curr != self.tail {
            let node = unsafe { &*self.curr };
            self.curr = node.next.load(Ordering::Relaxed);
            if !node.is_marked() {
                return Some(&node.key);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::List;

    #[test]
    fn empty_list() {
        let mut list: List<i32> = List::new();
        assert!(!list.find(7));
        assert!(!list.remove(7));
        assert_eq!(list.front(), list.tail());
        assert_eq!(list.iter().count(), 0);
    }

    #[test]
    fn singleton() {
        let mut list = List::new();
        assert!(list.insert(7));
        assert!(list.find(7));
        assert!(!list.insert(7));
        assert!(list.remove(7));
        assert!(!list.find(7));
        assert_eq!(list.iter().count(), 0);
    }

    #[test]
    fn sorted_unique() {
        let mut list = List::new();
        for key in [3, 1, 4, 1, 5, 9, 2, 6] {
            list.insert(key);
        }
        let keys: Vec<i32> = list.iter().copied().collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5, 6, 9]);
    }

    #[test]
    fn boundary_keys() {
        let mut list = List::new();
        for key in [10, 20, 30] {
            assert!(list.insert(key));
        }
        // Smallest and largest keys sit next to the sentinels.
        assert!(list.insert(5));
        assert!(list.insert(40));
        assert!(list.remove(5));
        assert!(list.remove(40));
        let keys: Vec<i32> = list.iter().copied().collect();
        assert_eq!(keys, vec![10, 20, 30]);
    }

    #[test]
    fn quiescent_walk_skips_nothing() {
        let mut list = List::new();
        for key in 0..100 {
            assert!(list.insert(key));
        }
        for key in (0..100).step_by(2) {
            assert!(list.remove(key));
        }
        let keys: Vec<i32> = list.iter().copied().collect();
        let expect: Vec<i32> = (0..100).filter(|k| k % 2 == 1).collect();
        assert_eq!(keys, expect);
    }
}
