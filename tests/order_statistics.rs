use bbst::{DefaultComparator, OrderStatisticUpdater, RbMap};

fn order_stat_map() -> RbMap<i32, i32, usize, OrderStatisticUpdater, DefaultComparator<i32>> {
    RbMap::with_updater(OrderStatisticUpdater, DefaultComparator::default())
}

#[test]
fn find_by_order_and_order_of_key_agree_on_1000_keys() {
    let mut map = order_stat_map();
    let mut keys: Vec<i32> = (0..1000).map(|i| i * 3).collect();
    use rand::seq::SliceRandom;
    let mut rng = rand::thread_rng();
    keys.shuffle(&mut rng);
    for &k in &keys {
        map.try_emplace(k, k);
    }
    map.check_invariants().unwrap();

    assert_eq!(map.size(), 1000);

    let mut sorted = keys.clone();
    sorted.sort_unstable();
    for (i, &k) in sorted.iter().enumerate() {
        assert_eq!(map.find_by_order(i), Some((&k, &k)));
        assert_eq!(map.order_of_key(&k), i);
    }
    assert_eq!(map.find_by_order(1000), None);
}

#[test]
fn order_of_key_on_absent_key_returns_insertion_rank() {
    let mut map = order_stat_map();
    for k in [10, 20, 30, 40] {
        map.try_emplace(k, k);
    }
    assert_eq!(map.order_of_key(&5), 0);
    assert_eq!(map.order_of_key(&15), 1);
    assert_eq!(map.order_of_key(&25), 2);
    assert_eq!(map.order_of_key(&45), 4);
}

#[test]
fn split_preserves_order_statistics_on_each_half() {
    let mut map = order_stat_map();
    for k in 0..200 {
        map.try_emplace(k, k);
    }
    let (left, right) = map.split_by_key(&100, false);
    left.check_invariants().unwrap();
    right.check_invariants().unwrap();
    assert_eq!(left.size(), 100);
    assert_eq!(right.size(), 100);
    for i in 0..100 {
        assert_eq!(left.find_by_order(i), Some((&(i as i32), &(i as i32))));
        assert_eq!(right.find_by_order(i), Some((&((i + 100) as i32), &((i + 100) as i32))));
    }
}
