use std::mem;
use std::ptr;

use crate::raw;

/// A set of pointers, keyed on identity.
///
/// The slot array and growth policy match [`PtrMap`](crate::PtrMap) with
/// the value region dropped. There is no remove operation.
///
/// # Examples
///
/// ```
/// use loquat::PtrSet;
///
/// let keys = [1, 2];
/// let mut set = PtrSet::new();
/// assert!(set.insert(&keys[0]));
/// assert!(!set.insert(&keys[0]));
/// assert!(set.contains(&keys[0]));
/// assert!(!set.contains(&keys[1]));
/// ```
pub struct PtrSet<'a, K> {
    keys: Box<[Option<&'a K>]>,
    occupied: usize,
}

impl<'a, K> PtrSet<'a, K> {
    /// Creates an empty set with a small default capacity.
    pub fn new() -> PtrSet<'a, K> {
        PtrSet::with_capacity(16)
    }

    /// Creates an empty set with at least `capacity` slots, rounded up to a
    /// power of two.
    pub fn with_capacity(capacity: usize) -> PtrSet<'a, K> {
        let capacity = raw::capacity_for(capacity);

        PtrSet {
            keys: vec![None; capacity].into_boxed_slice(),
            occupied: 0,
        }
    }

    /// Returns the number of members.
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// Returns `true` if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Adds `key` to the set, returning whether it was newly added.
    pub fn insert(&mut self, key: &'a K) -> bool {
        if self.occupied >= self.keys.len() / 2 {
            self.grow();
        }

        let mask = self.keys.len() - 1;
        let mut slot = raw::ptr_hash(key) as usize & mask;
        loop {
            match self.keys[slot] {
                Some(k) if ptr::eq(k, key) => return false,
                None => {
                    self.keys[slot] = Some(key);
                    self.occupied += 1;
                    return true;
                }
                Some(_) => slot = (slot + 1) & mask,
            }
        }
    }

    /// Returns `true` if `key` is a member of the set.
    pub fn contains(&self, key: &K) -> bool {
        let mask = self.keys.len() - 1;
        let mut slot = raw::ptr_hash(key) as usize & mask;
        loop {
            match self.keys[slot] {
                Some(k) if ptr::eq(k, key) => return true,
                None => return false,
                Some(_) => slot = (slot + 1) & mask,
            }
        }
    }

    fn grow(&mut self) {
        let capacity = self.keys.len() * 2;
        let old_keys = mem::replace(&mut self.keys, vec![None; capacity].into_boxed_slice());
        self.occupied = 0;

        for key in old_keys.iter() {
            if let Some(key) = *key {
                self.rehash(key);
            }
        }
    }

    fn rehash(&mut self, key: &'a K) {
        let mask = self.keys.len() - 1;
        let mut slot = raw::ptr_hash(key) as usize & mask;
        while self.keys[slot].is_some() {
            slot = (slot + 1) & mask;
        }

        self.keys[slot] = Some(key);
        self.occupied += 1;
    }
}

impl<'a, K> Default for PtrSet<'a, K> {
    fn default() -> Self {
        PtrSet::new()
    }
}
