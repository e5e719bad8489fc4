use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use squall::HashMap;
use std::collections::HashMap as StdHashMap;
use std::sync::Arc;
use std::thread;

const THREADS: usize = 4;
const OPS: usize = 10_000;
const KEYS_PER_THREAD: usize = 512;

/// Each thread owns a disjoint key range and mirrors its operations in a
/// local model. Because no other thread touches its keys, every observation
/// the thread makes must match the model exactly, while the shared table
/// underneath is resized and mutated by everyone at once.
#[test]
fn single_owner_churn() {
    let map = Arc::new(HashMap::<usize, usize>::with_stripes_and_capacity(2, 2));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let mut rng = SmallRng::seed_from_u64(0xDEC0DE + t as u64);
                let mut model = StdHashMap::new();
                let base = t * KEYS_PER_THREAD;

                for i in 0..OPS {
                    let key = base + rng.gen_range(0..KEYS_PER_THREAD);
                    let guard = map.guard();
                    match rng.gen_range(0..4) {
                        0 | 1 => {
                            let expected = model.insert(key, i);
                            assert_eq!(map.insert(key, i, &guard), expected.as_ref());
                        }
                        2 => {
                            let expected = model.remove(&key);
                            assert_eq!(map.remove(&key, &guard), expected.as_ref());
                        }
                        _ => {
                            assert_eq!(map.get(&key, &guard), model.get(&key));
                        }
                    }
                }

                model
            })
        })
        .collect();

    let mut expected_len = 0;
    let guard = map.guard();
    for h in handles {
        let model = h.join().unwrap();
        expected_len += model.len();
        for (k, v) in &model {
            assert_eq!(map.get(k, &guard), Some(v));
        }
    }
    assert_eq!(map.len(), expected_len);
}

/// Interleaved conditional operations on shared keys: whatever interleaving
/// happens, a `try_update` or `remove_if` that succeeds must have seen the
/// exact value it was told to expect, so per-key value histories stay
/// monotonic.
#[test]
fn shared_key_cas_churn() {
    let map = Arc::new(HashMap::<usize, usize>::new());
    {
        let guard = map.guard();
        for k in 0..64 {
            map.insert(k, 0, &guard);
        }
    }

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                let mut rng = SmallRng::seed_from_u64(0xFEED + t as u64);
                for _ in 0..OPS {
                    let key = rng.gen_range(0..64);
                    let guard = map.guard();
                    let current = match map.get(&key, &guard) {
                        Some(&v) => v,
                        None => {
                            // someone removed it; try to put it back at zero
                            map.get_or_insert(key, 0, &guard);
                            continue;
                        }
                    };
                    if rng.gen_bool(0.1) {
                        // removal only fires if the value is still `current`
                        map.remove_if(&key, &current, &guard);
                    } else {
                        // an increment only fires from the observed value
                        map.try_update(&key, current + 1, &current, &guard);
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    // the table must still be coherent: every surviving key is one of the 64
    let mut snapshot = map.snapshot();
    snapshot.sort();
    snapshot.dedup_by_key(|(k, _)| *k);
    assert!(snapshot.len() <= 64);
    for (k, _) in snapshot {
        assert!(k < 64);
    }
}
