//! Common surface of the set implementations, for the benchmark driver and
//! the shared stress harness.

pub trait ConcurrentSet<K>: Send + Sync {
    fn new() -> Self;
    fn insert(&self, key: K) -> bool;
    fn remove(&self, key: K) -> bool;
    fn find(&self, key: K) -> bool;
}

impl<K: Ord + Default + Send + Sync> ConcurrentSet<K> for crate::list::List<K> {
    fn new() -> Self {
        Self::new()
    }
    fn insert(&self, key: K) -> bool {
        self.insert(key)
    }
    fn remove(&self, key: K) -> bool {
        self.remove(key)
    }
    fn find(&self, key: K) -> bool {
        self.find(key)
    }
}

impl<K: Ord + Default + Send + Sync> ConcurrentSet<K> for crate::tagged::TaggedList<K> {
    fn new() -> Self {
        Self::new()
    }
    fn insert(&self, key: K) -> bool {
        self.insert(key)
    }
    fn remove(&self, key: K) -> bool {
        self.remove(key)
    }
    fn find(&self, key: K) -> bool {
        self.find(key)
    }
}

impl<K: Ord + Send + Sync> ConcurrentSet<K> for crate::coarse::CoarseList<K> {
    fn new() -> Self {
        Self::new()
    }
    fn insert(&self, key: K) -> bool {
        self.insert(key)
    }
    fn remove(&self, key: K) -> bool {
        self.remove(key)
    }
    fn find(&self, key: K) -> bool {
        self.find(key)
    }
}
