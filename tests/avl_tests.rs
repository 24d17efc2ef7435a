use bbst::{AvlMap, DefaultComparator, IntervalUpdater, OrderStatisticUpdater};
use itertools::Itertools;

#[test]
fn empty_map_has_no_entries() {
    let map: AvlMap<i32, &str> = AvlMap::new();
    assert!(map.is_empty());
    assert_eq!(map.get(&1), None);
}

#[test]
fn insert_then_lookup_every_permutation_of_small_key_sets() {
    for n in 1..=6 {
        let keys: Vec<i32> = (0..n).collect();
        for perm in keys.into_iter().permutations(n as usize) {
            let mut map: AvlMap<i32, i32> = AvlMap::new();
            for &k in &perm {
                let (inserted, v) = map.try_emplace(k, k * 10);
                assert!(inserted);
                assert_eq!(*v, k * 10);
            }
            map.check_invariants().unwrap();
            assert_eq!(map.len(), perm.len());
            for &k in &perm {
                assert_eq!(map.get(&k), Some(&(k * 10)));
            }
            let collected: Vec<i32> = map.iter().map(|(k, _)| *k).collect();
            let mut sorted = perm.clone();
            sorted.sort_unstable();
            assert_eq!(collected, sorted);
        }
    }
}

#[test]
fn large_random_insert_maintains_invariants_and_order() {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut map: AvlMap<i32, i32> = AvlMap::new();
    let mut keys: Vec<i32> = Vec::new();
    for _ in 0..2000 {
        let k: i32 = rng.gen_range(0, 5000);
        if map.try_emplace(k, k).0 {
            keys.push(k);
        }
    }
    map.check_invariants().unwrap();
    keys.sort_unstable();
    keys.dedup();
    assert_eq!(map.len(), keys.len());
    let collected: Vec<i32> = map.iter().map(|(k, _)| *k).collect();
    assert_eq!(collected, keys);
}

#[test]
fn join_based_delete_under_stress() {
    use rand::seq::SliceRandom;
    let mut rng = rand::thread_rng();
    let mut map: AvlMap<i32, i32> = AvlMap::new();
    let mut present: Vec<i32> = (0..500).collect();
    for &k in &present {
        map.try_emplace(k, k);
    }
    present.shuffle(&mut rng);
    for (i, k) in present.iter().enumerate() {
        let removed = map.remove(k);
        assert_eq!(removed, Some(*k));
        assert_eq!(map.len(), present.len() - i - 1);
        map.check_invariants().unwrap();
    }
    assert!(map.is_empty());
}

#[test]
fn avl_stays_more_tightly_balanced_than_its_black_height_cousin() {
    // AVL's balance invariant (|height_diff| <= 1 everywhere) is stronger
    // than red-black's (a red-black tree's height can reach ~2*log2(n));
    // this just checks the invariant holds under a skewed insert order that
    // would unbalance a naive unbalanced BST.
    let mut map: AvlMap<i32, i32> = AvlMap::new();
    for k in 0..500 {
        map.try_emplace(k, k);
    }
    map.check_invariants().unwrap();
}

#[test]
fn order_statistic_metadata_survives_random_insert_and_remove() {
    use rand::seq::SliceRandom;
    let mut rng = rand::thread_rng();
    let mut map: AvlMap<i32, i32, usize, OrderStatisticUpdater, DefaultComparator<i32>> =
        AvlMap::with_updater(OrderStatisticUpdater, DefaultComparator::default());
    let mut present: Vec<i32> = (0..300).collect();
    present.shuffle(&mut rng);
    for &k in &present {
        map.try_emplace(k, k);
        map.check_invariants().unwrap();
    }
    present.shuffle(&mut rng);
    for k in present.iter().take(150) {
        map.remove(k);
        map.check_invariants().unwrap();
    }
}

#[test]
fn interval_metadata_survives_random_insert() {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut map: AvlMap<(i32, i32), (), (i32, i32), IntervalUpdater, DefaultComparator<(i32, i32)>> =
        AvlMap::with_updater(IntervalUpdater, DefaultComparator::default());
    for _ in 0..300 {
        let lo: i32 = rng.gen_range(0, 1000);
        let hi = lo + rng.gen_range(0, 50);
        map.try_emplace((lo, hi), ());
        map.check_invariants().unwrap();
    }
}

#[test]
fn iter_mut_doubles_every_value() {
    let mut map: AvlMap<i32, i32> = AvlMap::new();
    for k in 0..50 {
        map.try_emplace(k, k);
    }
    for (_, v) in map.iter_mut() {
        *v *= 2;
    }
    for k in 0..50 {
        assert_eq!(map.get(&k), Some(&(k * 2)));
    }
}
