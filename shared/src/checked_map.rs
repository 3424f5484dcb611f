use std::collections::{HashMap, HashSet};
use std::hash::Hash;

// CheckedMap

/// A `HashMap` that refuses to silently replace or drop entries.
///
/// Callers are expected to test for presence first; inserting a key that is
/// already present (or removing one that is not) is a broken invariant and
/// panics.
pub struct CheckedMap<K: Eq + Hash, V> {
    inner: HashMap<K, V>,
}

impl<K: Eq + Hash, V> CheckedMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: HashMap::with_capacity(capacity),
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.inner.contains_key(&key) {
            panic!("Cannot insert and replace value for given key. Check first.")
        }

        self.inner.insert(key, value);
    }

    pub fn remove(&mut self, key: &K) -> V {
        match self.inner.remove(key) {
            Some(value) => value,
            None => panic!("Cannot remove value for key with non-existent value. Check whether map contains key first."),
        }
    }

    pub fn iter(&self) -> std::collections::hash_map::Iter<'_, K, V> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl<K: Eq + Hash, V> Default for CheckedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// CheckedSet

/// A `HashSet` with the same check-first discipline as [`CheckedMap`].
pub struct CheckedSet<K: Eq + Hash> {
    inner: HashSet<K>,
}

impl<K: Eq + Hash> CheckedSet<K> {
    pub fn new() -> Self {
        Self {
            inner: HashSet::new(),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn insert(&mut self, key: K) {
        if self.inner.contains(&key) {
            panic!("Cannot insert and replace given key. Check first.")
        }

        self.inner.insert(key);
    }

    pub fn remove(&mut self, key: &K) {
        if !self.inner.remove(key) {
            panic!("Cannot remove given non-existent key. Check first.")
        }
    }

    pub fn iter(&self) -> std::collections::hash_set::Iter<'_, K> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl<K: Eq + Hash> Default for CheckedSet<K> {
    fn default() -> Self {
        Self::new()
    }
}
