use std::cmp::Ordering;
use std::collections::BTreeMap;

use halomatch::collections::{find_first_ge, AvlTree, Traversal};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const ARRAY_LENGTH: usize = 111;

fn compare_int(items: &[i32], index: usize, target: &i32) -> Ordering {
    items[index].cmp(target)
}

// --- Ordered Index ---

#[test]
fn test_insert_rejects_duplicate_keys() {
    let mut tree = AvlTree::new();
    assert!(tree.insert(1, "first"));
    for _ in 0..9 {
        assert!(!tree.insert(1, "again"));
    }
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.find(&1), Some(&"first"));
}

#[test]
fn test_upsert_increments_histogram_counts() {
    let mut tree: AvlTree<u64, u32> = AvlTree::new();
    for cell in [7, 3, 7, 7, 1, 3] {
        tree.upsert(cell, || 1, |c| *c += 1);
    }
    let pairs: Vec<_> = tree.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(pairs, vec![(1, 1), (3, 2), (7, 3)]);
}

#[test]
fn test_traversals_visit_every_node_once() {
    let mut tree = AvlTree::new();
    for k in 0..200 {
        tree.insert((k * 37) % 200, ());
    }

    let mut count = 0;
    tree.traverse(Traversal::PreOrder, |_, _| count += 1);
    assert_eq!(count, 200);

    let mut in_order = Vec::new();
    tree.traverse(Traversal::InOrder, |k, _| in_order.push(*k));
    assert_eq!(in_order, (0..200).collect::<Vec<_>>());
}

#[test]
fn test_find_and_delete_missing_key() {
    let mut tree = AvlTree::new();
    for k in (0..113).step_by(3) {
        tree.insert(k, k as f64);
    }
    assert!(tree.find(&5).is_none());
    assert!(tree.delete(&5).is_none());
    assert_eq!(tree.len(), 38);

    assert_eq!(tree.delete(&6), Some(6.0));
    assert!(tree.find(&6).is_none());
    assert_eq!(tree.find(&9), Some(&9.0));
}

#[test]
fn test_random_operations_match_btreemap() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut tree = AvlTree::new();
    let mut model = BTreeMap::new();

    for _ in 0..5000 {
        let key: u32 = rng.gen_range(0..500);
        if rng.gen_bool(0.6) {
            let inserted = tree.insert(key, key * 2);
            assert_eq!(inserted, !model.contains_key(&key));
            model.entry(key).or_insert(key * 2);
        } else {
            assert_eq!(tree.delete(&key), model.remove(&key));
        }
    }

    assert_eq!(tree.len(), model.len());
    let got: Vec<_> = tree.iter().map(|(k, v)| (*k, *v)).collect();
    let want: Vec<_> = model.into_iter().collect();
    assert_eq!(got, want);

    // 1.44 * log2(500) bounds any AVL tree with at most 500 nodes
    assert!(tree.height() <= 13);
}

#[test]
fn test_clear_releases_everything() {
    let mut tree = AvlTree::new();
    for k in 0..50 {
        tree.insert(k, vec![k; 4]);
    }
    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.len(), 0);
    assert!(tree.min_key().is_none());
}

// --- Range Search ---

#[test]
fn test_constant_array_returns_first_index() {
    let array = [0; ARRAY_LENGTH];
    assert_eq!(find_first_ge(&0, &array, compare_int), Some(0));
    assert_eq!(find_first_ge(&1, &array, compare_int), None);
}

#[test]
fn test_duplicate_runs_resolve_to_run_start() {
    let array: Vec<i32> = (0..ARRAY_LENGTH as i32).map(|i| i / 3).collect();
    for v in 0..(ARRAY_LENGTH as i32 / 3) {
        assert_eq!(find_first_ge(&v, &array, compare_int), Some(3 * v as usize));
    }
}

#[test]
fn test_element_at_the_end_is_found() {
    let mut array = [0; ARRAY_LENGTH];
    array[ARRAY_LENGTH - 1] = 1;
    assert_eq!(find_first_ge(&1, &array, compare_int), Some(ARRAY_LENGTH - 1));

    array[ARRAY_LENGTH - 2] = 1;
    assert_eq!(find_first_ge(&1, &array, compare_int), Some(ARRAY_LENGTH - 2));
}

#[test]
fn test_target_between_values_returns_next_larger() {
    let array = [1, 1, 4, 4, 4, 9];
    assert_eq!(find_first_ge(&2, &array, compare_int), Some(2));
    assert_eq!(find_first_ge(&5, &array, compare_int), Some(5));
    assert_eq!(find_first_ge(&10, &array, compare_int), None);
}

#[test]
fn test_every_length_and_target_agrees_with_partition_point() {
    for len in 0..20 {
        let array: Vec<i32> = (0..len).map(|i| i / 2).collect();
        for t in -1..12 {
            let want = array.partition_point(|&x| x < t);
            let want = (want < array.len()).then_some(want);
            assert_eq!(find_first_ge(&t, &array, compare_int), want, "len {} target {}", len, t);
        }
    }
}
