use squall::*;
use std::sync::Arc;

mod hasher;
use hasher::ZeroHashBuilder;

#[test]
fn new() {
    let _map = HashMap::<usize, usize>::new();
}

#[test]
fn clear() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();
    {
        map.insert(0, 1, &guard);
        map.insert(1, 1, &guard);
        map.insert(2, 1, &guard);
        map.insert(3, 1, &guard);
        map.insert(4, 1, &guard);
    }
    map.clear(&guard);
    assert!(map.is_empty());
    assert_eq!(map.get(&0, &guard), None);
}

#[test]
fn insert() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();
    let old = map.insert(42, 0, &guard);
    assert!(old.is_none());
}

#[test]
fn get_empty() {
    let map = HashMap::<usize, usize>::new();

    {
        let guard = map.guard();
        let e = map.get(&42, &guard);
        assert!(e.is_none());
    }
}

#[test]
fn get_key_value_empty() {
    let map = HashMap::<usize, usize>::new();

    {
        let guard = map.guard();
        let e = map.get_key_value(&42, &guard);
        assert!(e.is_none());
    }
}

#[test]
fn remove_empty() {
    let map = HashMap::<usize, usize>::new();

    {
        let guard = map.guard();
        let old = map.remove(&42, &guard);
        assert!(old.is_none());
    }
}

#[test]
fn remove_twice_reports_absence() {
    let map = HashMap::<usize, usize>::new();

    {
        let guard = map.guard();
        map.insert(42, 0, &guard);
        assert_eq!(map.remove(&42, &guard), Some(&0));
        assert_eq!(map.remove(&42, &guard), None);
        assert_eq!(map.remove(&42, &guard), None);
    }
}

#[test]
fn insert_and_remove() {
    let map = HashMap::<usize, usize>::new();

    {
        let guard = map.guard();
        map.insert(42, 0, &guard);
        let old = map.remove(&42, &guard).unwrap();
        assert_eq!(old, &0);
        assert!(map.get(&42, &guard).is_none());
    }
}

#[test]
fn insert_and_get() {
    let map = HashMap::<usize, usize>::new();

    map.insert(42, 0, &map.guard());
    {
        let guard = map.guard();
        let e = map.get(&42, &guard).unwrap();
        assert_eq!(e, &0);
    }
}

#[test]
fn insert_and_get_key_value() {
    let map = HashMap::<usize, usize>::new();

    map.insert(42, 0, &map.guard());
    {
        let guard = map.guard();
        let e = map.get_key_value(&42, &guard).unwrap();
        assert_eq!(e, (&42, &0));
    }
}

#[test]
fn update() {
    let map = HashMap::<usize, usize>::new();

    let guard = map.guard();
    map.insert(42, 0, &guard);
    let old = map.insert(42, 1, &guard);
    assert_eq!(old, Some(&0));
    {
        let guard = map.guard();
        let e = map.get(&42, &guard).unwrap();
        assert_eq!(e, &1);
    }
    assert_eq!(map.len(), 1);
}

#[test]
fn try_insert() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();

    assert_eq!(map.try_insert(42, 0, &guard), Ok(&0));
    assert_eq!(
        map.try_insert(42, 1, &guard),
        Err(TryInsertError {
            current: &0,
            not_inserted: 1,
        })
    );
    // the failed insert must not have mutated anything
    assert_eq!(map.get(&42, &guard), Some(&0));
    assert_eq!(map.len(), 1);
}

#[test]
fn try_update_cas_semantics() {
    let map = HashMap::<&'static str, usize>::new();
    let guard = map.guard();

    // the concrete sequence the compare-and-swap contract promises
    assert_eq!(map.try_insert("a", 1, &guard).is_ok(), true);
    assert_eq!(map.try_insert("a", 2, &guard).is_ok(), false);
    assert_eq!(map.get("a", &guard), Some(&1));
    assert!(map.try_update("a", 2, &1, &guard));
    assert!(!map.try_update("a", 3, &1, &guard));
    assert_eq!(map.get("a", &guard), Some(&2));
}

#[test]
fn try_update_absent_key() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();
    assert!(!map.try_update(&42, 1, &0, &guard));
    assert!(map.get(&42, &guard).is_none());
}

#[test]
fn remove_if_matches_value() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();

    map.insert(42, 0, &guard);
    assert_eq!(map.remove_if(&42, &1, &guard), None);
    assert_eq!(map.get(&42, &guard), Some(&0));
    assert_eq!(map.remove_if(&42, &0, &guard), Some(&0));
    assert_eq!(map.get(&42, &guard), None);
}

#[test]
fn get_or_insert() {
    let map = HashMap::<&'static str, usize>::new();
    let guard = map.guard();

    assert_eq!(map.get_or_insert("x", 10, &guard), &10);
    // the second value loses; the first stays
    assert_eq!(map.get_or_insert("x", 20, &guard), &10);
    assert_eq!(map.len(), 1);
}

#[test]
fn get_or_insert_with_skips_factory_when_present() {
    let map = HashMap::<&'static str, usize>::new();
    let guard = map.guard();

    assert_eq!(map.get_or_insert_with("x", || 10, &guard), &10);
    assert_eq!(
        map.get_or_insert_with("x", || panic!("factory must not run"), &guard),
        &10
    );
}

#[test]
fn update_or_insert() {
    let map = HashMap::<&'static str, usize>::new();
    let guard = map.guard();

    assert_eq!(map.update_or_insert("n", |_, n| n + 1, 0, &guard), &0);
    assert_eq!(map.update_or_insert("n", |_, n| n + 1, 0, &guard), &1);
    assert_eq!(map.update_or_insert("n", |_, n| n + 1, 0, &guard), &2);
    assert_eq!(map.get("n", &guard), Some(&2));
}

#[test]
fn update_or_insert_with() {
    let map = HashMap::<&'static str, usize>::new();
    let guard = map.guard();

    map.update_or_insert_with("n", |_, n| n + 1, || 100, &guard);
    map.update_or_insert_with("n", |_, n| n + 1, || 100, &guard);
    assert_eq!(map.get("n", &guard), Some(&101));
}

#[test]
fn from_entries() {
    let map = HashMap::from_entries([("a", 1), ("b", 2), ("c", 3)]).unwrap();
    let guard = map.guard();
    assert_eq!(map.len(), 3);
    assert_eq!(map.get("a", &guard), Some(&1));
    assert_eq!(map.get("b", &guard), Some(&2));
    assert_eq!(map.get("c", &guard), Some(&3));
}

#[test]
fn from_entries_rejects_duplicates() {
    let res = HashMap::from_entries([("a", 1), ("a", 2)]);
    assert_eq!(res.unwrap_err(), DuplicateKeyError { key: "a" });
}

#[test]
fn extend_overwrites() {
    let map = HashMap::<usize, usize>::new();
    {
        let guard = map.guard();
        map.insert(1, 1, &guard);
    }

    let mut mref = &map;
    mref.extend([(1, 10), (2, 20)]);

    let guard = map.guard();
    assert_eq!(map.get(&1, &guard), Some(&10));
    assert_eq!(map.get(&2, &guard), Some(&20));
    assert_eq!(map.len(), 2);
}

#[test]
fn snapshot_is_complete_and_unique() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();
    for i in 0..100 {
        map.insert(i, i * 2, &guard);
    }

    let mut snapshot = map.snapshot();
    assert_eq!(snapshot.len(), 100);
    snapshot.sort();
    snapshot.dedup_by_key(|(k, _)| *k);
    assert_eq!(snapshot.len(), 100, "no key may appear twice");
    for (k, v) in snapshot {
        assert_eq!(v, k * 2);
    }
}

#[test]
fn len_and_is_empty() {
    let map = HashMap::<usize, usize>::new();
    assert_eq!(map.len(), 0);
    assert!(map.is_empty());

    let guard = map.guard();
    for i in 0..10 {
        map.insert(i, i, &guard);
    }
    assert_eq!(map.len(), 10);
    assert!(!map.is_empty());

    for i in 0..10 {
        map.remove(&i, &guard);
    }
    assert_eq!(map.len(), 0);
    assert!(map.is_empty());
}

#[test]
fn one_bucket() {
    let map = HashMap::<&'static str, usize, _>::with_hasher(ZeroHashBuilder);
    let guard = map.guard();

    // we want to check that all operations work regardless on whether
    // we are operating on the head of a bucket, the tail of the bucket,
    // or somewhere in the middle.
    let v = map.insert("head", 0, &guard);
    assert_eq!(v, None);
    let v = map.insert("middle", 10, &guard);
    assert_eq!(v, None);
    let v = map.insert("tail", 100, &guard);
    assert_eq!(v, None);
    let e = map.get("head", &guard).unwrap();
    assert_eq!(e, &0);
    let e = map.get("middle", &guard).unwrap();
    assert_eq!(e, &10);
    let e = map.get("tail", &guard).unwrap();
    assert_eq!(e, &100);

    // check that replacing the keys returns the correct old value
    let v = map.insert("head", 1, &guard);
    assert_eq!(v, Some(&0));
    let v = map.insert("middle", 11, &guard);
    assert_eq!(v, Some(&10));
    let v = map.insert("tail", 101, &guard);
    assert_eq!(v, Some(&100));
    // and updated the right value
    let e = map.get("head", &guard).unwrap();
    assert_eq!(e, &1);
    let e = map.get("middle", &guard).unwrap();
    assert_eq!(e, &11);
    let e = map.get("tail", &guard).unwrap();
    assert_eq!(e, &101);
    // and that remove produces the right value
    // note that we must remove them in a particular order
    // so that we test all three node positions
    let v = map.remove("middle", &guard);
    assert_eq!(v, Some(&11));
    let v = map.remove("tail", &guard);
    assert_eq!(v, Some(&101));
    let v = map.remove("head", &guard);
    assert_eq!(v, Some(&1));
}

#[test]
fn resize_transparency() {
    // a tiny initial table with a single stripe maximizes the number of
    // resizes this run through
    let map = HashMap::<usize, usize>::with_stripes_and_capacity(1, 1);
    let guard = map.guard();
    for i in 0..1000 {
        map.insert(i, i, &guard);
    }
    assert_eq!(map.len(), 1000);
    for i in 0..1000 {
        assert_eq!(map.get(&i, &guard), Some(&i), "key {} lost by resize", i);
    }
}

#[test]
fn value_dropped_on_remove() {
    let map = HashMap::<usize, Arc<usize>>::new();
    let v = Arc::new(42usize);
    {
        let guard = map.guard();
        map.insert(0, Arc::clone(&v), &guard);
        assert_eq!(Arc::strong_count(&v), 2);
        map.remove(&0, &guard);
    }
    drop(map);
    assert_eq!(Arc::strong_count(&v), 1);
}

#[test]
fn value_dropped_on_overwrite() {
    let map = HashMap::<usize, Arc<usize>>::new();
    let v1 = Arc::new(1usize);
    let v2 = Arc::new(2usize);
    {
        let guard = map.guard();
        map.insert(0, Arc::clone(&v1), &guard);
        map.insert(0, Arc::clone(&v2), &guard);
    }
    drop(map);
    assert_eq!(Arc::strong_count(&v1), 1);
    assert_eq!(Arc::strong_count(&v2), 1);
}

#[test]
fn values_dropped_on_clear() {
    let map = HashMap::<usize, Arc<usize>>::new();
    let values: Vec<_> = (0..64).map(Arc::new).collect();
    {
        let guard = map.guard();
        for (i, v) in values.iter().enumerate() {
            map.insert(i, Arc::clone(v), &guard);
        }
        map.clear(&guard);
    }
    drop(map);
    for v in &values {
        assert_eq!(Arc::strong_count(v), 1);
    }
}

#[test]
fn entries_dropped_exactly_once_across_resizes() {
    // node chains are rebuilt on every resize while the value allocations
    // are shared between generations; this would double-free or leak if the
    // resize retired the wrong pieces
    let map = HashMap::<Arc<usize>, Arc<usize>>::with_stripes_and_capacity(1, 1);
    let keys: Vec<_> = (0..200).map(Arc::new).collect();
    let values: Vec<_> = (0..200).map(Arc::new).collect();
    {
        let guard = map.guard();
        for (k, v) in keys.iter().zip(&values) {
            map.insert(Arc::clone(k), Arc::clone(v), &guard);
        }
    }
    drop(map);
    for k in &keys {
        assert_eq!(Arc::strong_count(k), 1);
    }
    for v in &values {
        assert_eq!(Arc::strong_count(v), 1);
    }
}

#[test]
fn empty_maps_equal() {
    let a = HashMap::<usize, usize>::new();
    let b = HashMap::<usize, usize>::new();
    assert_eq!(a, b);
}

#[test]
fn different_size_maps_not_equal() {
    let a = HashMap::<usize, usize>::new();
    let b = HashMap::<usize, usize>::new();
    {
        let guard = a.guard();
        a.insert(1, 1, &guard);
        a.insert(2, 2, &guard);
        b.insert(1, 1, &b.guard());
    }
    assert_ne!(a, b);
}

#[test]
fn same_content_maps_equal() {
    let a = HashMap::<usize, usize>::new();
    let b = HashMap::<usize, usize>::new();
    {
        a.pin().insert(1, 10);
        a.pin().insert(2, 20);
        b.pin().insert(2, 20);
        b.pin().insert(1, 10);
    }
    assert_eq!(a, b);
}

#[test]
fn debug_format_empty() {
    let map = HashMap::<usize, usize>::new();
    assert_eq!(format!("{:?}", map), "{}");
}

#[test]
fn pinned_index() {
    let map = HashMap::<usize, usize>::new();
    map.pin().insert(1, 42);
    let mref = map.pin();
    assert_eq!(mref[&1], 42);
}

#[test]
#[should_panic(expected = "no entry found for key")]
fn pinned_index_missing_key() {
    let map = HashMap::<usize, usize>::new();
    let mref = map.pin();
    let _ = mref[&1];
}

#[test]
fn pinned_ref_mirrors_map() {
    let map = HashMap::<usize, usize>::new();
    let mref = map.pin();

    assert!(mref.try_insert(1, 1).is_ok());
    assert_eq!(mref.get_or_insert(2, 2), &2);
    assert_eq!(mref.get_or_insert_with(3, || 3), &3);
    assert!(mref.try_update(&1, 10, &1));
    assert_eq!(mref.update_or_insert(4, |_, v| v + 1, 4), &4);
    assert_eq!(mref.update_or_insert_with(4, |_, v| v + 1, || 0), &5);
    assert_eq!(mref.remove_if(&2, &1), None);
    assert_eq!(mref.remove_if(&2, &2), Some(&2));
    assert_eq!(mref.remove_entry(&3), Some((&3, &3)));
    assert_eq!(mref.len(), 2);
    assert!(mref.contains_key(&1));
    assert_eq!(mref.get_key_value(&1), Some((&1, &10)));
    assert_eq!(mref.iter().count(), 2);
    assert_eq!(mref.keys().count(), 2);
    assert_eq!(mref.values().count(), 2);

    mref.clear();
    assert!(mref.is_empty());
}

#[test]
fn with_guard_reuses_external_guard() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();
    let mref = map.with_guard(&guard);
    mref.insert(1, 1);
    assert_eq!(mref.get(&1), Some(&1));
}

#[test]
fn guards_are_checked_against_their_map() {
    let a = HashMap::<usize, usize>::new();
    let b = HashMap::<usize, usize>::new();
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let guard = b.guard();
        a.insert(1, 1, &guard);
    }));
    assert!(res.is_err());
}

#[test]
fn iteration_sees_prior_inserts() {
    let map = HashMap::<usize, usize>::new();
    let guard = map.guard();
    for i in 0..512 {
        map.insert(i, i, &guard);
    }

    let mut seen: Vec<_> = map.iter(&guard).map(|(k, _)| *k).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..512).collect::<Vec<_>>());
}
