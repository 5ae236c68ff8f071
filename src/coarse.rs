//! Single-mutex sorted list, the reference baseline the lock-free variants
//! are measured against.

use std::sync::Mutex;

struct Node<K> {
    key: K,
    next: Option<Box<Node<K>>>,
}

/// Sorted set of keys behind one lock. Correct by mutual exclusion; every
/// operation serializes on the mutex.
pub struct CoarseList<K> {
    inner: Mutex<Option<Box<Node<K>>>>,
}

impl<K: Ord> Default for CoarseList<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> CoarseList<K> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    pub fn insert(&self, key: K) -> bool {
        let mut guard = self.inner.lock().unwrap();
        let mut slot = &mut *guard;
        while slot.as_ref().map_or(false, |node| node.key < key) {
            slot = &mut slot.as_mut().unwrap().next;
        }
        if slot.as_ref().map_or(false, |node| node.key == key) {
            return false;
        }
        let next = slot.take();
        *slot = Some(Box::new(Node { key, next }));
        true
    }

    pub fn remove(&self, key: K) -> bool {
        let mut guard = self.inner.lock().unwrap();
        let mut slot = &mut *guard;
        while slot.as_ref().map_or(false, |node| node.key < key) {
            slot = &mut slot.as_mut().unwrap().next;
        }
        match slot.take() {
            Some(node) if node.key == key => {
                *slot = node.next;
                true
            }
            displaced => {
                *slot = displaced;
                false
            }
        }
    }

    pub fn find(&self, key: K) -> bool {
        let guard = self.inner.lock().unwrap();
        let mut curr = guard.as_deref();
        while let Some(node) = curr {
            if node.key == key {
                return true;
            }
            if node.key > key {
                return false;
            }
            curr = node.next.as_deref();
        }
        false
    }

    /// Snapshot of the keys in order, taken under the lock.
    pub fn to_vec(&self) -> Vec<K>
    where
        K: Clone,
    {
        let guard = self.inner.lock().unwrap();
        let mut keys = Vec::new();
        let mut curr = guard.as_deref();
        while let Some(node) = curr {
            keys.push(node.key.clone());
            curr = node.next.as_deref();
        }
        keys
    }
}

impl<K> Drop for CoarseList<K> {
    fn drop(&mut self) {
        // Unlink iteratively so a long chain cannot overflow the stack with
        // recursive box drops.
        let mut curr = self.inner.get_mut().unwrap().take();
        while let Some(mut node) = curr {
            curr = node.next.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CoarseList;

    #[test]
    fn set_semantics() {
        let list = CoarseList::new();
        assert!(!list.find(7));
        assert!(!list.remove(7));
        assert!(list.insert(7));
        assert!(!list.insert(7));
        assert!(list.find(7));
        assert!(list.remove(7));
        assert!(list.to_vec().is_empty());
    }

    #[test]
    fn sorted_unique() {
        let list = CoarseList::new();
        for key in [3, 1, 4, 1, 5, 9, 2, 6] {
            list.insert(key);
        }
        assert_eq!(list.to_vec(), vec![1, 2, 3, 4, 5, 6, 9]);
    }
}
