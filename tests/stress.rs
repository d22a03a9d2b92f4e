use loquat::{PtrMap, SyncMap};
use rand::prelude::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;

mod common;

#[test]
fn concurrent_disjoint_inserts() {
    const ENTRIES: usize = if cfg!(miri) { 128 } else { 1 << 14 };

    let keys: Vec<usize> = (0..ENTRIES).collect();
    let map = SyncMap::with_capacity(ENTRIES / 4);

    let chunk = ENTRIES / common::threads();
    let chunks: Vec<&[usize]> = keys.chunks(chunk).collect();
    let barrier = Barrier::new(chunks.len());

    thread::scope(|s| {
        let map = &map;
        let barrier = &barrier;
        for chunk_keys in chunks {
            s.spawn(move || {
                barrier.wait();
                for key in chunk_keys {
                    map.insert(key, key);
                }
            });
        }
    });

    for key in keys.iter() {
        let value = map.get(key).expect("missing key after concurrent insert");
        assert!(std::ptr::eq(value, key));
    }

    let mut count = 0;
    map.for_each(|_, _| count += 1);
    assert_eq!(count, ENTRIES);
}

#[test]
fn concurrent_same_key_updates() {
    const ROUNDS: usize = if cfg!(miri) { 64 } else { 1 << 14 };

    let key = 0usize;
    let threads = common::threads();
    let values: Vec<usize> = (0..threads).collect();

    let map = SyncMap::with_capacity(4);
    map.insert(&key, &values[0]);

    let barrier = Barrier::new(threads + 1);

    thread::scope(|s| {
        let map = &map;
        let barrier = &barrier;
        let key = &key;
        let values = &values;

        for value in values.iter() {
            s.spawn(move || {
                barrier.wait();
                for _ in 0..ROUNDS {
                    map.insert(key, value);
                }
            });
        }

        // A torn write would surface as a reference outside the arena the
        // updaters draw from.
        s.spawn(move || {
            barrier.wait();
            for _ in 0..ROUNDS {
                let seen = map.get(key).expect("key vanished");
                assert!(values.iter().any(|v| std::ptr::eq(v, seen)));
            }
        });
    });

    let last = map.get(&key).unwrap();
    assert!(values.iter().any(|v| std::ptr::eq(v, last)));
}

#[test]
fn concurrent_compare_and_swap_single_winner() {
    const ITERATIONS: usize = if cfg!(miri) { 4 } else { 256 };

    let threads = common::threads();
    let values: Vec<usize> = (0..threads).collect();
    let keys: Vec<usize> = (0..ITERATIONS).collect();

    for key in keys.iter() {
        let map = SyncMap::with_capacity(8);
        let winners = AtomicUsize::new(0);
        let barrier = Barrier::new(threads);

        thread::scope(|s| {
            let map = &map;
            let barrier = &barrier;
            let winners = &winners;

            for value in values.iter() {
                s.spawn(move || {
                    barrier.wait();
                    if map.compare_and_swap(key, None, value).is_none() {
                        winners.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        assert_eq!(winners.load(Ordering::Relaxed), 1);
        let stored = map.get(key).expect("no winner stored");
        assert!(values.iter().any(|v| std::ptr::eq(v, stored)));
    }
}

#[test]
fn concurrent_readers_during_inserts() {
    const ENTRIES: usize = if cfg!(miri) { 128 } else { 1 << 12 };

    let keys: Vec<usize> = (0..ENTRIES).collect();
    let map = SyncMap::with_capacity(64);

    let readers = common::threads();
    let barrier = Barrier::new(readers + 1);

    thread::scope(|s| {
        let map = &map;
        let barrier = &barrier;
        let keys = &keys;

        s.spawn(move || {
            barrier.wait();
            for key in keys.iter() {
                map.insert(key, key);
            }
        });

        for _ in 0..readers {
            s.spawn(move || {
                barrier.wait();
                for key in keys.iter() {
                    // A key may not be published yet, but once it is, the
                    // value must be the one written for it.
                    if let Some(value) = map.get(key) {
                        assert!(std::ptr::eq(value, key));
                    }
                }
            });
        }
    });

    for key in keys.iter() {
        assert!(std::ptr::eq(map.get(key).unwrap(), key));
    }
}

#[test]
fn shuffled_growth() {
    const ENTRIES: usize = if cfg!(miri) { 256 } else { 1 << 13 };

    let mut rng = rand::thread_rng();
    let keys: Vec<usize> = (0..ENTRIES).collect();
    let values: Vec<usize> = (ENTRIES..2 * ENTRIES).collect();

    let mut order: Vec<usize> = (0..ENTRIES).collect();
    order.shuffle(&mut rng);

    let mut map = PtrMap::with_capacity(4);
    for &i in order.iter() {
        map.insert(&keys[i], &values[i]);
    }

    debug!("occupied after inserts: {}", map.len());

    order.shuffle(&mut rng);
    for &i in order.iter() {
        assert_eq!(map.get(&keys[i]), Some(&values[i]));
    }
}
