use super::table::{Matched, RouteTable};

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use http::Method;
use parking_lot::Mutex;
use tracing::{debug, trace};

const NIL: usize = usize::MAX;

/// Bounded map evicting the least recently used key.
///
/// Entries live in a slot vector linked by index; the map points into it.
#[derive(Debug)]
pub struct LruCache<V> {
    map: HashMap<Arc<str>, usize>,
    nodes: Vec<Node<V>>,
    head: usize,
    tail: usize,
    capacity: NonZeroUsize,
}

#[derive(Debug)]
struct Node<V> {
    key: Arc<str>,
    value: V,
    prev: usize,
    next: usize,
}

impl<V> LruCache<V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            map: HashMap::new(),
            nodes: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Looks up `key` and marks it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let idx = *self.map.get(key)?;
        self.touch(idx);
        Some(&self.nodes[idx].value)
    }

    /// Inserts or replaces `key`, returning the evicted entry if capacity overflowed.
    pub fn insert(&mut self, key: &str, value: V) -> Option<(Arc<str>, V)> {
        if let Some(&idx) = self.map.get(key) {
            self.nodes[idx].value = value;
            self.touch(idx);
            return None;
        }

        let key: Arc<str> = key.into();

        if self.nodes.len() < self.capacity.get() {
            let idx = self.nodes.len();
            self.nodes.push(Node {
                key: Arc::clone(&key),
                value,
                prev: NIL,
                next: NIL,
            });
            self.map.insert(key, idx);
            self.push_front(idx);
            return None;
        }

        let idx = self.tail;
        self.unlink(idx);
        let node = &mut self.nodes[idx];
        let old_key = std::mem::replace(&mut node.key, Arc::clone(&key));
        let old_value = std::mem::replace(&mut node.value, value);
        self.map.remove(&old_key);
        self.map.insert(key, idx);
        self.push_front(idx);
        Some((old_key, old_value))
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    fn touch(&mut self, idx: usize) {
        if self.head != idx {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        match prev {
            NIL => self.head = next,
            p => self.nodes[p].next = next,
        }
        match next {
            NIL => self.tail = prev,
            n => self.nodes[n].prev = prev,
        }
    }

    fn push_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;
        match self.head {
            NIL => self.tail = idx,
            h => self.nodes[h].prev = idx,
        }
        self.head = idx;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Memoizes [`RouteTable::find`] by `"{METHOD}:{PATH}"`.
///
/// The table is owned and read-only, so a cached result never goes stale.
/// Callers must pass the same `fallbacks` on every call: they are part of the cached value.
/// Two threads missing the same key both compute it; the last insert wins.
#[derive(Debug)]
pub struct MatchCache<T> {
    table: RouteTable<T>,
    lru: Mutex<LruCache<Arc<[Matched<T>]>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> MatchCache<T> {
    pub fn new(table: RouteTable<T>, capacity: NonZeroUsize) -> Self {
        Self {
            table,
            lru: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn table(&self) -> &RouteTable<T> {
        &self.table
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.lru.lock().len(),
        }
    }
}

impl<T: Clone> MatchCache<T> {
    pub fn find(&self, method: &Method, path: &str, fallbacks: &[T]) -> Arc<[Matched<T>]> {
        let key = cache_key(method, path);

        if let Some(hit) = self.lru.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(%key, "match cache hit");
            return Arc::clone(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let matched: Arc<[Matched<T>]> = self.table.find(method, path, fallbacks).into();
        debug!(%key, matches = matched.len(), "match cache miss");

        if let Some((evicted, _)) = self.lru.lock().insert(&key, Arc::clone(&matched)) {
            trace!(%evicted, "match cache eviction");
        }
        matched
    }
}

fn cache_key(method: &Method, path: &str) -> String {
    let method = method.as_str();
    let mut key = String::with_capacity(method.len() + 1 + path.len());
    key.push_str(method);
    key.push(':');
    key.push_str(path);
    key
}
