use std::{
    sync::{Arc, Barrier},
    thread,
};

use paste::paste;
use stepmap::{hash::BuildHasherAdapter, ConcurrentMap};

const NUM_WRITERS: u64 = 8;
const NUM_READERS: u64 = 4;
const KEYS_PER_WRITER: u64 = 3_000;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Writers own disjoint key ranges. Each writer inserts its range, overwrites
// every key once and removes every fourth key. Readers look up random keys the
// whole time, which also drives the migrations forward.
macro_rules! generate_test_writers_and_readers {
    ($name:ident, $map_init:expr) => {
        paste! {
            #[test]
            fn [<test_ $name _writers_and_readers>]() {
                init_logger();
                let map = Arc::new($map_init);
                let barrier = Arc::new(Barrier::new((NUM_WRITERS + NUM_READERS) as usize));

                let writers = (0..NUM_WRITERS).map(|thread_id| {
                    let my_map = Arc::clone(&map);
                    let my_barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        my_barrier.wait();
                        let base = thread_id * KEYS_PER_WRITER;

                        for key in base..base + KEYS_PER_WRITER {
                            assert_eq!(my_map.insert(key, key), None);
                        }
                        for key in base..base + KEYS_PER_WRITER {
                            assert_eq!(my_map.insert(key, key + 1), Some(key));
                        }
                        for key in (base..base + KEYS_PER_WRITER).step_by(4) {
                            assert_eq!(my_map.remove(&key), Some(key + 1));
                        }
                    })
                });

                let readers = (0..NUM_READERS).map(|thread_id| {
                    let my_map = Arc::clone(&map);
                    let my_barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        my_barrier.wait();
                        let mut state = thread_id + 1;
                        for _ in 0..20_000 {
                            // xorshift
                            state ^= state << 13;
                            state ^= state >> 7;
                            state ^= state << 17;
                            let key = state % (NUM_WRITERS * KEYS_PER_WRITER);
                            if let Some(value) = my_map.get(&key) {
                                assert!(value == key || value == key + 1);
                            }
                        }
                    })
                });

                let handles: Vec<_> = writers.chain(readers).collect();
                handles
                    .into_iter()
                    .for_each(|t| t.join().expect("Thread failed"));

                let survivors = (0..NUM_WRITERS * KEYS_PER_WRITER)
                    .filter(|key| (key % KEYS_PER_WRITER) % 4 != 0)
                    .count();
                assert_eq!(map.len(), survivors);
                for key in 0..NUM_WRITERS * KEYS_PER_WRITER {
                    let expected = ((key % KEYS_PER_WRITER) % 4 != 0).then(|| key + 1);
                    assert_eq!(map.get(&key), expected, "key {key}");
                }
                assert!(map.capacity().is_power_of_two());
            }
        }
    };
}

generate_test_writers_and_readers!(default_map, ConcurrentMap::<u64, u64>::with_capacity(4));
generate_test_writers_and_readers!(
    small_step_map,
    ConcurrentMap::<u64, u64>::builder().rehash_step(1).name("small-step").build()
);
generate_test_writers_and_readers!(
    low_load_factor_map,
    ConcurrentMap::<u64, u64>::builder().load_factor(0.1).build()
);
generate_test_writers_and_readers!(
    ahash_map,
    ConcurrentMap::with_capacity_and_hasher(16, BuildHasherAdapter::new(ahash::RandomState::new()))
);

#[test]
fn readers_see_every_key_while_resizing() {
    init_logger();
    const PRELOADED: u64 = 10_000;

    let map = Arc::new(ConcurrentMap::builder().rehash_step(2).build());
    let barrier = Arc::new(Barrier::new(5));

    for key in 0..PRELOADED {
        map.insert(key, key.to_string());
    }

    // One writer keeps the map growing while the readers check that the
    // preloaded keys never disappear.
    let writer = {
        let my_map = Arc::clone(&map);
        let my_barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            my_barrier.wait();
            for key in PRELOADED..PRELOADED * 4 {
                my_map.insert(key, key.to_string());
            }
        })
    };

    let readers: Vec<_> = (0..4u64)
        .map(|thread_id| {
            let my_map = Arc::clone(&map);
            let my_barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                my_barrier.wait();
                for round in 0..5 {
                    for key in (thread_id..PRELOADED).step_by(4) {
                        assert_eq!(
                            my_map.get_with(&key, |v| v.parse::<u64>().ok()),
                            Some(Some(key)),
                            "key {key} was not visible in round {round}"
                        );
                    }
                }
            })
        })
        .collect();

    writer.join().expect("Thread failed");
    for reader in readers {
        reader.join().expect("Thread failed");
    }

    assert_eq!(map.len(), (PRELOADED * 4) as usize);
    assert!(map.stats().resize_count() >= 2);
}

#[test]
fn len_never_exceeds_the_number_of_distinct_keys() {
    const NUM_THREADS: usize = 8;
    const KEYS: u32 = 1_000;

    let map = Arc::new(ConcurrentMap::with_capacity(16));
    let barrier = Arc::new(Barrier::new(NUM_THREADS + 1));

    // Every thread inserts the same keys, so most inserts are overwrites that
    // race with the migration of the very same keys.
    let handles: Vec<_> = (0..NUM_THREADS as u32)
        .map(|thread_id| {
            let my_map = Arc::clone(&map);
            let my_barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                my_barrier.wait();
                for key in 0..KEYS {
                    my_map.insert(key, thread_id);
                }
            })
        })
        .collect();

    let watcher = {
        let my_map = Arc::clone(&map);
        let my_barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            my_barrier.wait();
            for _ in 0..10_000 {
                assert!(my_map.len() <= KEYS as usize);
            }
        })
    };

    handles
        .into_iter()
        .chain(std::iter::once(watcher))
        .for_each(|t| t.join().expect("Thread failed"));

    assert_eq!(map.len(), KEYS as usize);
    for key in 0..KEYS {
        assert!(map.contains_key(&key));
    }
}
