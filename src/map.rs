use std::mem;
use std::ptr;

use crate::raw::{self, Probe};

/// A hash table keyed on pointer identity.
///
/// `PtrMap` maps references to references, comparing keys by address rather
/// than by value: two keys name the same entry only if they are the same
/// object. This is the right shape for interned data, where a facility
/// outside the map guarantees one canonical address per logical key.
///
/// Entries live in a pair of flat slot arrays under open addressing, and
/// the table doubles once half the slots have been claimed. Rehashing every
/// entry is expensive, so pick a generous capacity up front.
///
/// # Deletion
///
/// [`remove`](PtrMap::remove) blanks the value but leaves the key in its
/// slot, keeping the probe paths of every other entry intact. A removed
/// slot is never reclaimed: a workload that keeps removing and inserting
/// distinct keys grows the table without bound, and should periodically
/// rebuild into a fresh map instead.
///
/// # Examples
///
/// ```
/// use loquat::PtrMap;
///
/// let keys = [1, 2];
/// let mut map = PtrMap::new();
/// map.insert(&keys[0], &10);
/// map.insert(&keys[1], &20);
///
/// assert_eq!(map.get(&keys[0]), Some(&10));
/// assert!(map.get(&5).is_none());
/// ```
pub struct PtrMap<'a, K, V> {
    keys: Box<[Option<&'a K>]>,
    values: Box<[Option<&'a V>]>,
    occupied: usize,
}

impl<'a, K, V> PtrMap<'a, K, V> {
    const DEFAULT_CAPACITY: usize = 16;

    /// Creates an empty map with a small default capacity.
    pub fn new() -> PtrMap<'a, K, V> {
        PtrMap::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates an empty map with at least `capacity` slots, rounded up to a
    /// power of two.
    ///
    /// The table doubles once half its slots are claimed, so a hint of
    /// twice the expected entry count avoids rehashing entirely.
    pub fn with_capacity(capacity: usize) -> PtrMap<'a, K, V> {
        let capacity = raw::capacity_for(capacity);

        PtrMap {
            keys: vec![None; capacity].into_boxed_slice(),
            values: vec![None; capacity].into_boxed_slice(),
            occupied: 0,
        }
    }

    /// Returns the cumulative number of slots claimed by inserts.
    ///
    /// Removed entries keep their slot, so after a `remove` this is an
    /// upper bound on the live entry count, not the count itself. It never
    /// decreases.
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Returns `true` if no slot has ever been claimed.
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Inserts a key/value pair, returning the live value it replaced.
    ///
    /// A key removed earlier may be re-inserted; in that case there is no
    /// live value to replace and `None` is returned.
    pub fn insert(&mut self, key: &'a K, value: &'a V) -> Option<&'a V> {
        if self.occupied >= self.keys.len() / 2 {
            self.grow();
        }

        let mut probe = Probe::start(raw::ptr_hash(key), self.keys.len());
        loop {
            match self.keys[probe.i] {
                Some(k) if ptr::eq(k, key) => {
                    return self.values[probe.i].replace(value);
                }
                None => {
                    self.keys[probe.i] = Some(key);
                    self.values[probe.i] = Some(value);
                    self.occupied += 1;
                    return None;
                }
                Some(_) => probe.next(),
            }
        }
    }

    /// Returns the value stored for `key`, if any.
    pub fn get(&self, key: &K) -> Option<&'a V> {
        let mut probe = Probe::start(raw::ptr_hash(key), self.keys.len());
        loop {
            match self.keys[probe.i] {
                Some(k) if ptr::eq(k, key) => return self.values[probe.i],
                None => return None,
                Some(_) => probe.next(),
            }
        }
    }

    /// Removes `key`, returning the value it held.
    ///
    /// The key keeps its slot so that probe sequences running through it
    /// stay valid; see the type-level notes on deletion. Removing an absent
    /// key does nothing.
    pub fn remove(&mut self, key: &K) -> Option<&'a V> {
        let mut probe = Probe::start(raw::ptr_hash(key), self.keys.len());
        loop {
            match self.keys[probe.i] {
                Some(k) if ptr::eq(k, key) => return self.values[probe.i].take(),
                None => return None,
                Some(_) => probe.next(),
            }
        }
    }

    /// An iterator over the live entries, in no particular order.
    pub fn iter(&self) -> Iter<'_, 'a, K, V> {
        Iter { map: self, slot: 0 }
    }

    // Doubles the table and reinserts every claimed slot. Removed entries
    // are carried over with their blank value; a claimed slot counts
    // against the load factor whether or not it still holds one.
    fn grow(&mut self) {
        let capacity = self.keys.len() * 2;
        let old_keys = mem::replace(&mut self.keys, vec![None; capacity].into_boxed_slice());
        let old_values = mem::replace(&mut self.values, vec![None; capacity].into_boxed_slice());
        self.occupied = 0;

        for (key, value) in old_keys.iter().zip(old_values.iter()) {
            if let Some(key) = *key {
                self.rehash(key, *value);
            }
        }
    }

    // Claims a slot for `key` in the grown table. Stored keys are
    // pairwise distinct, so only an empty slot can end the probe.
    fn rehash(&mut self, key: &'a K, value: Option<&'a V>) {
        let mut probe = Probe::start(raw::ptr_hash(key), self.keys.len());
        while self.keys[probe.i].is_some() {
            probe.next();
        }

        self.keys[probe.i] = Some(key);
        self.values[probe.i] = value;
        self.occupied += 1;
    }
}

impl<'a, K, V> Default for PtrMap<'a, K, V> {
    fn default() -> Self {
        PtrMap::new()
    }
}

/// An iterator over the live entries of a [`PtrMap`].
pub struct Iter<'map, 'a, K, V> {
    map: &'map PtrMap<'a, K, V>,
    slot: usize,
}

impl<'a, K, V> Iterator for Iter<'_, 'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.slot < self.map.keys.len() {
            let slot = self.slot;
            self.slot += 1;

            if let (Some(key), Some(value)) = (self.map.keys[slot], self.map.values[slot]) {
                return Some((key, value));
            }
        }

        None
    }
}
