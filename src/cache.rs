//! Bounded, clearable computation cache keyed by request signature.
//! Exists only to avoid recomputation within one scheduling pass; any
//! entry may be evicted or the whole cache discarded at any time.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

struct Inner<V> {
    map: HashMap<String, V>,
    order: VecDeque<String>,
}

pub struct ComputeCache<V> {
    inner: Mutex<Inner<V>>,
    capacity: usize,
}

impl<V: Clone> ComputeCache<V> {
    /// A capacity of 0 disables storage entirely; callers still get
    /// their computed values back.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.lock().map.get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        if self.capacity == 0 {
            return;
        }
        let key = key.into();
        let mut inner = self.inner.lock();
        if inner.map.insert(key.clone(), value).is_none() {
            inner.order.push_back(key);
            while inner.order.len() > self.capacity {
                if let Some(evicted) = inner.order.pop_front() {
                    inner.map.remove(&evicted);
                }
            }
        }
    }

    pub fn get_or_insert_with(&self, key: &str, compute: impl FnOnce() -> V) -> V {
        if let Some(hit) = self.get(key) {
            return hit;
        }
        let value = compute();
        self.insert(key.to_string(), value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.order.clear();
    }
}
