//! Least-recently-used map bounded by entry count

use std::borrow::Borrow;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Statistics about cache usage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently held
    pub entries: usize,

    /// Maximum number of entries
    pub capacity: usize,

    /// Lookups through `get` that found an entry
    pub hits: u64,

    /// Lookups through `get` that found nothing
    pub misses: u64,

    /// Entries dropped to make room for new ones
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache holding at most `capacity` entries.
///
/// `get` and `insert` refresh recency; `peek` does not. Inserting past
/// capacity evicts the least recently used entry and hands it back.
///
/// ```
/// use comicflip_cache::LruCache;
///
/// let mut cache = LruCache::new(2);
/// cache.insert("a", 1);
/// cache.insert("b", 2);
/// cache.get(&"a");
/// let evicted = cache.insert("c", 3);
/// assert_eq!(evicted, Some(("b", 2)));
/// ```
#[derive(Debug)]
pub struct LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    capacity: usize,
    map: HashMap<K, V>,
    /// Least recently used at the front
    order: VecDeque<K>,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            stats: CacheStats { capacity, ..Default::default() },
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Look up without touching recency or statistics
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key)
    }

    /// Look up and mark as most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        if self.map.contains_key(key) {
            self.stats.hits += 1;
            self.touch(key);
        } else {
            self.stats.misses += 1;
        }

        self.map.get(key)
    }

    /// Insert or replace, returning the entry evicted to make room.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.map.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return None;
        }

        self.order.push_back(key);
        if self.map.len() <= self.capacity {
            return None;
        }

        let oldest = self.order.pop_front()?;
        let value = self.map.remove(&oldest)?;
        self.stats.evictions += 1;
        Some((oldest, value))
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let value = self.map.remove(key)?;
        self.order.retain(|k| <K as Borrow<Q>>::borrow(k) != key);
        Some(value)
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    /// Keys from least to most recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    /// Entries from least to most recently used
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.order.iter().filter_map(|k| self.map.get_key_value(k))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats { entries: self.map.len(), ..self.stats }
    }

    fn touch<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        if let Some(pos) = self.order.iter().position(|k| <K as Borrow<Q>>::borrow(k) == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}
