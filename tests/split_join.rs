use bbst::RbMap;

#[test]
fn split_then_iterate_partitions_around_the_key() {
    let mut map: RbMap<i32, i32> = RbMap::new();
    for k in 0..100 {
        map.try_emplace(k, k);
    }
    let (left, right) = map.split_by_key(&50, true);
    left.check_invariants().unwrap();
    right.check_invariants().unwrap();
    assert_eq!(left.len(), 51);
    assert_eq!(right.len(), 49);
    assert_eq!(left.iter().map(|(k, _)| *k).collect::<Vec<_>>(), (0..=50).collect::<Vec<_>>());
    assert_eq!(right.iter().map(|(k, _)| *k).collect::<Vec<_>>(), (51..100).collect::<Vec<_>>());
}

#[test]
fn split_equal_on_right_excludes_the_pivot_from_the_left_half() {
    let mut map: RbMap<i32, i32> = RbMap::new();
    for k in 0..10 {
        map.try_emplace(k, k);
    }
    let (left, right) = map.split_by_key(&5, false);
    assert_eq!(left.iter().map(|(k, _)| *k).collect::<Vec<_>>(), (0..5).collect::<Vec<_>>());
    assert_eq!(right.iter().map(|(k, _)| *k).collect::<Vec<_>>(), (5..10).collect::<Vec<_>>());
}

#[test]
fn split_at_the_edges_of_the_key_range_yields_one_empty_half() {
    let mut map: RbMap<i32, i32> = RbMap::new();
    for k in 0..20 {
        map.try_emplace(k, k);
    }
    let (below_all, above_all) = map.split_by_key(&(-1), true);
    assert!(below_all.is_empty());
    assert_eq!(above_all.len(), 20);

    let mut map: RbMap<i32, i32> = RbMap::new();
    for k in 0..20 {
        map.try_emplace(k, k);
    }
    let (all, none) = map.split_by_key(&19, true);
    assert_eq!(all.len(), 20);
    assert!(none.is_empty());
}

#[test]
fn join_with_pivot_rebuilds_the_original_ordering() {
    let mut left: RbMap<i32, i32> = RbMap::new();
    for k in 0..30 {
        left.try_emplace(k, k);
    }
    let mut right: RbMap<i32, i32> = RbMap::new();
    for k in 31..60 {
        right.try_emplace(k, k);
    }
    let joined = RbMap::join_with_pivot(left, 30, 30, right);
    joined.check_invariants().unwrap();
    assert_eq!(joined.len(), 60);
    assert_eq!(joined.iter().map(|(k, _)| *k).collect::<Vec<_>>(), (0..60).collect::<Vec<_>>());
}

#[test]
fn join_with_an_empty_side_is_just_the_other_side_plus_the_pivot() {
    let empty: RbMap<i32, i32> = RbMap::new();
    let mut right: RbMap<i32, i32> = RbMap::new();
    for k in 1..10 {
        right.try_emplace(k, k);
    }
    let joined = RbMap::join_with_pivot(empty, 0, 0, right);
    joined.check_invariants().unwrap();
    assert_eq!(joined.iter().map(|(k, _)| *k).collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
}

#[test]
fn split_then_join_round_trips_to_the_original_key_set() {
    let mut map: RbMap<i32, i32> = RbMap::new();
    for k in 0..77 {
        if k != 40 {
            map.try_emplace(k, k);
        }
    }
    let (left, right) = map.split_by_key(&40, true);
    let rejoined = RbMap::join_with_pivot(left, 40, 40, right);
    rejoined.check_invariants().unwrap();
    assert_eq!(rejoined.len(), 77);
    assert_eq!(rejoined.iter().map(|(k, _)| *k).collect::<Vec<_>>(), (0..77).collect::<Vec<_>>());
}
