use stepmap::{ConcurrentMap, DEFAULT_REHASH_STEP, MIN_CAPACITY};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn grows_from_a_tiny_capacity() {
    init_logger();
    let map = ConcurrentMap::builder()
        .initial_capacity(4)
        .name("scenario-a")
        .build();
    assert_eq!(map.capacity(), MIN_CAPACITY);

    for i in 0..100 {
        map.insert(format!("key{i}"), i);
    }

    assert_eq!(map.len(), 100);
    assert!(map.capacity() >= 128);
    assert_eq!(map.get("key57"), Some(57));
}

#[test]
fn overwrite_then_remove() {
    let map = ConcurrentMap::new();

    assert_eq!(map.insert("k", 1), None);
    assert_eq!(map.insert("k", 2), Some(1));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("k"), Some(2));

    assert_eq!(map.remove("k"), Some(2));
    assert_eq!(map.get("k"), None);
    assert_eq!(map.len(), 0);
    assert!(map.is_empty());
}

#[test]
fn constant_hasher_puts_everything_in_one_chain() {
    let map = ConcurrentMap::with_capacity_and_hasher(16, |_: &u32| 42u64);

    for i in 0..100u32 {
        map.insert(i, i.to_string());
    }
    assert_eq!(map.len(), 100);
    for i in 0..100u32 {
        assert_eq!(map.get(&i), Some(i.to_string()));
    }

    for i in (0..100u32).filter(|i| i % 2 == 0) {
        assert_eq!(map.remove(&i), Some(i.to_string()));
    }
    assert_eq!(map.len(), 50);
    for i in 0..100u32 {
        assert_eq!(map.contains_key(&i), i % 2 == 1, "key {i}");
    }
}

#[test]
fn no_key_is_lost_across_resizes() {
    let map = ConcurrentMap::with_capacity(16);

    // Check every key after every insert, so lookups run in the middle of
    // several migrations.
    for i in 0..2_000u64 {
        map.insert(i, i * 10);
        if i % 97 == 0 {
            for j in 0..=i {
                assert_eq!(map.get(&j), Some(j * 10), "lost key {j} after {i} inserts");
            }
        }
    }
    for i in 0..2_000u64 {
        assert_eq!(map.get(&i), Some(i * 10));
    }
    assert!(map.stats().completed_resize_count() >= 6);
}

#[test]
fn no_key_is_stored_twice() {
    let map = ConcurrentMap::with_capacity(16);

    for round in 0..3u32 {
        for i in 0..500u32 {
            map.insert(i, round);
            assert!(map.len() <= 500);
        }
        assert_eq!(map.len(), 500);
    }

    for i in 0..500u32 {
        assert_eq!(map.remove(&i), Some(2));
        assert_eq!(map.remove(&i), None);
    }
    assert!(map.is_empty());
}

#[test]
fn overwrites_keep_the_length() {
    let map = ConcurrentMap::new();
    for i in 0..50u8 {
        map.insert(i, 'a');
    }
    let len = map.len();
    let capacity = map.capacity();

    for i in 0..50u8 {
        assert_eq!(map.insert(i, 'b'), Some('a'));
    }
    assert_eq!(map.len(), len);
    assert_eq!(map.capacity(), capacity);
}

#[test]
fn capacity_is_always_a_power_of_two() {
    let check = |map: &ConcurrentMap<u32, ()>| {
        let capacity = map.capacity();
        assert!(capacity.is_power_of_two());
        assert!(capacity >= MIN_CAPACITY);
    };

    for hint in [0, 1, 15, 16, 17, 100, 1000] {
        let map = ConcurrentMap::with_capacity(hint);
        check(&map);

        for i in 0..3_000u32 {
            if i % 5 == 4 {
                map.remove(&(i - 2));
            } else {
                map.insert(i, ());
            }
            check(&map);
        }
    }
}

#[test]
fn lookups_alone_finish_a_resize() {
    let map = ConcurrentMap::with_capacity(1024);
    let mut i = 0u32;
    while !map.is_resizing() {
        map.insert(i, i);
        i += 1;
    }

    let previous_capacity = map.capacity() / 2;
    let bound = (previous_capacity + DEFAULT_REHASH_STEP - 1) / DEFAULT_REHASH_STEP;

    let mut lookups = 0;
    while map.is_resizing() {
        map.get(&u32::MAX);
        lookups += 1;
        assert!(lookups <= bound, "more than {bound} lookups to finish");
    }
    assert_eq!(lookups, bound);

    for k in 0..i {
        assert_eq!(map.get(&k), Some(k));
    }
}

#[test]
fn custom_load_factor_and_step() {
    let map = ConcurrentMap::builder()
        .load_factor(0.25)
        .rehash_step(1)
        .build();

    // 4 / 16 = 0.25 is not above the load factor, 5 / 16 is.
    for i in 0..5u8 {
        map.insert(i, ());
    }
    assert!(!map.is_resizing());
    map.insert(5, ());
    assert!(map.is_resizing());

    let mut ops = 0;
    while map.is_resizing() {
        map.contains_key(&0);
        ops += 1;
    }
    assert_eq!(ops, 16);
}

#[test]
fn stats_count_lookups_and_resizes() {
    let map = ConcurrentMap::with_capacity(16);
    for i in 0..12u16 {
        map.insert(i, ());
    }
    let stats = map.stats();
    assert_eq!(stats.resize_count(), 0);
    assert_eq!(stats.request_count(), 0);
    assert_eq!(stats.hit_rate(), 1.0);

    map.insert(12, ());
    assert_eq!(map.stats().resize_count(), 1);

    for i in 0..20u16 {
        map.get(&i);
    }
    let stats = map.stats();
    assert_eq!(stats.hit_count(), 13);
    assert_eq!(stats.miss_count(), 7);
    assert_eq!(stats.completed_resize_count(), 1);
    assert_eq!(stats.migrated_bucket_count(), 16);
    assert_eq!(stats.migrated_entry_count(), 12);
}
