use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::raw;

/// A lock-free hash table keyed on pointer identity.
///
/// `SyncMap` trades the open addressing of the other tables for per-bucket
/// chains so that publishing an entry is a single pointer compare-and-swap:
/// any number of threads may call [`insert`](SyncMap::insert),
/// [`get`](SyncMap::get), [`compare_and_swap`](SyncMap::compare_and_swap),
/// and [`for_each`](SyncMap::for_each) concurrently with no lock. The
/// bucket count is fixed at construction and the map never resizes; chains
/// simply lengthen as it fills, so choose the capacity generously.
///
/// A node, once linked into a chain, stays reachable until the map itself
/// is dropped. There is no remove operation: that invariant is what lets a
/// reader follow `next` links without coordinating with writers.
///
/// # Examples
///
/// ```
/// use loquat::SyncMap;
///
/// let keys = [1, 2];
/// let map = SyncMap::with_capacity(64);
/// map.insert(&keys[0], &10);
///
/// assert_eq!(map.get(&keys[0]), Some(&10));
/// assert_eq!(map.get(&keys[1]), None);
/// ```
pub struct SyncMap<'a, K, V> {
    buckets: Box<[AtomicPtr<Node<'a, K, V>>]>,
}

struct Node<'a, K, V> {
    next: AtomicPtr<Node<'a, K, V>>,
    key: &'a K,
    value: AtomicPtr<V>,
}

// Safety: the map only ever hands out shared references to keys and
// values. Nodes are owned by the table, reached through atomics, and freed
// solely in `drop`, which has exclusive access.
unsafe impl<'a, K: Sync, V: Sync> Send for SyncMap<'a, K, V> {}
unsafe impl<'a, K: Sync, V: Sync> Sync for SyncMap<'a, K, V> {}

impl<'a, K, V: 'a> SyncMap<'a, K, V> {
    /// Creates a map with a fixed number of buckets, rounded up to a power
    /// of two.
    pub fn with_capacity(capacity: usize) -> SyncMap<'a, K, V> {
        let capacity = raw::capacity_for(capacity);
        let buckets = (0..capacity)
            .map(|_| AtomicPtr::new(ptr::null_mut()))
            .collect();

        SyncMap { buckets }
    }

    #[inline]
    fn bucket(&self, key: &K) -> &AtomicPtr<Node<'a, K, V>> {
        let slot = raw::ptr_hash(key) as usize & (self.buckets.len() - 1);
        &self.buckets[slot]
    }

    /// Inserts or updates a key, returning the value it replaced.
    ///
    /// Updating an existing entry is an atomic swap of that node's value:
    /// concurrent readers observe either the old or the new reference,
    /// never anything in between. Publishing a new entry compare-and-swaps
    /// the link observed to end the chain, retrying from the bucket head
    /// whenever a racing insert claims that link first.
    pub fn insert(&self, key: &'a K, value: &'a V) -> Option<&'a V> {
        let head = self.bucket(key);

        loop {
            let mut link = head;
            loop {
                let node = link.load(Ordering::Acquire);
                if node.is_null() {
                    break;
                }

                let node = unsafe { &*node };
                if ptr::eq(node.key, key) {
                    let prev = node.value.swap(value as *const V as *mut V, Ordering::AcqRel);
                    return Some(unsafe { &*prev });
                }

                link = &node.next;
            }

            let new = Box::into_raw(Box::new(Node {
                next: AtomicPtr::new(ptr::null_mut()),
                key,
                value: AtomicPtr::new(value as *const V as *mut V),
            }));

            match link.compare_exchange(
                ptr::null_mut(),
                new,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return None,

                // Lost the race for the end of the chain. The winner may
                // even have linked this same key, so rescan from the head.
                Err(_) => unsafe { drop(Box::from_raw(new)) },
            }
        }
    }

    /// Returns the value stored for `key`, if any.
    pub fn get(&self, key: &K) -> Option<&'a V> {
        let mut node = self.bucket(key).load(Ordering::Acquire);
        while !node.is_null() {
            let n = unsafe { &*node };
            if ptr::eq(n.key, key) {
                let value = n.value.load(Ordering::Acquire);
                return Some(unsafe { &*value });
            }

            node = n.next.load(Ordering::Acquire);
        }

        None
    }

    /// Publishes `new` for `key` only if the entry currently holds
    /// `current`, where `None` means the key is absent.
    ///
    /// Returns the value witnessed by the attempt; the swap took effect
    /// exactly when that equals `current`. An absent key with
    /// `current == None` links a fresh node, under the same retry
    /// discipline as [`insert`](SyncMap::insert).
    pub fn compare_and_swap(
        &self,
        key: &'a K,
        current: Option<&V>,
        new: &'a V,
    ) -> Option<&'a V> {
        let expected = current.map_or(ptr::null_mut(), |v| v as *const V as *mut V);
        let head = self.bucket(key);

        loop {
            let mut link = head;
            loop {
                let node = link.load(Ordering::Acquire);
                if node.is_null() {
                    break;
                }

                let node = unsafe { &*node };
                if ptr::eq(node.key, key) {
                    return match node.value.compare_exchange(
                        expected,
                        new as *const V as *mut V,
                        Ordering::AcqRel,
                        Ordering::Acquire,
                    ) {
                        Ok(prev) | Err(prev) => Some(unsafe { &*prev }),
                    };
                }

                link = &node.next;
            }

            // The key is absent, so the swap can only apply if the caller
            // expected that.
            if current.is_some() {
                return None;
            }

            let node = Box::into_raw(Box::new(Node {
                next: AtomicPtr::new(ptr::null_mut()),
                key,
                value: AtomicPtr::new(new as *const V as *mut V),
            }));

            match link.compare_exchange(
                ptr::null_mut(),
                node,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return None,
                Err(_) => unsafe { drop(Box::from_raw(node)) },
            }
        }
    }

    /// Calls `f` for every entry in the map.
    ///
    /// Entries published before the call are all visited exactly once;
    /// entries inserted concurrently with it may or may not be seen.
    pub fn for_each(&self, mut f: impl FnMut(&'a K, &'a V)) {
        for bucket in self.buckets.iter() {
            let mut node = bucket.load(Ordering::Acquire);
            while !node.is_null() {
                let n = unsafe { &*node };
                let value = n.value.load(Ordering::Acquire);
                f(n.key, unsafe { &*value });

                node = n.next.load(Ordering::Acquire);
            }
        }
    }
}

impl<'a, K, V> Drop for SyncMap<'a, K, V> {
    fn drop(&mut self) {
        for bucket in self.buckets.iter_mut() {
            let mut node = *bucket.get_mut();
            while !node.is_null() {
                let boxed = unsafe { Box::from_raw(node) };
                node = boxed.next.load(Ordering::Relaxed);
            }
        }
    }
}
