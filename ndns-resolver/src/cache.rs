use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use ndns_face::Data;
use ndns_types::Name;

/// A cache entry plus the freshness window it was inserted with (spec §4.6
/// "Cache entries respect the data's freshness"): `inserted_at` is this
/// process's local clock reading at insertion time, not anything carried on
/// the wire, since freshness is a relative TTL-like period, not an absolute
/// timestamp.
struct Entry {
    data: Data,
    inserted_at: Instant,
    freshness_period: Duration,
}

impl Entry {
    fn is_fresh(&self) -> bool {
        self.inserted_at.elapsed() <= self.freshness_period
    }
}

/// A FIFO-evicting bounded cache keyed by interest name (spec §9): once
/// full, the oldest entry is evicted regardless of how recently it was
/// used. Entries also expire on their own freshness period (spec §4.6),
/// independently of FIFO eviction — a `get` on an expired entry is a miss,
/// even if the cache is nowhere near capacity. Shared by the NS-delegation
/// lookups the iterative controller performs and by the certificate
/// fetcher's plain-cert path.
pub struct FifoCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    entries: HashMap<Name, Entry>,
    order: VecDeque<Name>,
}

impl FifoCache {
    pub fn new(capacity: usize) -> Self {
        FifoCache {
            capacity,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Returns the cached `Data` for `name` if present and still within its
    /// freshness period; an expired entry is evicted and treated as a miss.
    pub fn get(&self, name: &Name) -> Option<Data> {
        let mut inner = self.inner.lock().unwrap();
        match inner.entries.get(name) {
            Some(entry) if entry.is_fresh() => Some(entry.data.clone()),
            Some(_) => {
                inner.entries.remove(name);
                inner.order.retain(|n| n != name);
                None
            }
            None => None,
        }
    }

    /// Inserts `data`, fresh for `freshness_period` seconds from now (the
    /// same freshness period carried by the `Response` it was decoded
    /// from).
    pub fn insert(&self, name: Name, data: Data, freshness_period: u32) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.entries.contains_key(&name) {
            inner.order.push_back(name.clone());
        }
        inner.entries.insert(
            name.clone(),
            Entry {
                data,
                inserted_at: Instant::now(),
                freshness_period: Duration::from_secs(u64::from(freshness_period)),
            },
        );
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(name: &Name) -> Data {
        Data {
            name: name.clone(),
            content: vec![],
            key_locator: Name::root(),
            signature: vec![],
        }
    }

    #[test]
    fn evicts_oldest_entry_when_full() {
        let cache = FifoCache::new(2);
        let a = Name::from_labels(&["a"]);
        let b = Name::from_labels(&["b"]);
        let c = Name::from_labels(&["c"]);

        cache.insert(a.clone(), data(&a), 3600);
        cache.insert(b.clone(), data(&b), 3600);
        cache.insert(c.clone(), data(&c), 3600);

        assert!(cache.get(&a).is_none());
        assert!(cache.get(&b).is_some());
        assert!(cache.get(&c).is_some());
        assert_eq!(2, cache.len());
    }

    #[test]
    fn reinserting_does_not_reorder_eviction() {
        let cache = FifoCache::new(2);
        let a = Name::from_labels(&["a"]);
        let b = Name::from_labels(&["b"]);
        let c = Name::from_labels(&["c"]);

        cache.insert(a.clone(), data(&a), 3600);
        cache.insert(b.clone(), data(&b), 3600);
        cache.insert(a.clone(), data(&a), 3600);
        cache.insert(c.clone(), data(&c), 3600);

        assert!(cache.get(&a).is_none());
    }

    #[test]
    fn expired_entry_is_a_miss_even_with_spare_capacity() {
        let cache = FifoCache::new(16);
        let a = Name::from_labels(&["a"]);

        cache.insert(a.clone(), data(&a), 0);
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert!(cache.get(&a).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn fresh_entry_within_its_period_is_a_hit() {
        let cache = FifoCache::new(16);
        let a = Name::from_labels(&["a"]);

        cache.insert(a.clone(), data(&a), 3600);

        assert!(cache.get(&a).is_some());
    }
}
