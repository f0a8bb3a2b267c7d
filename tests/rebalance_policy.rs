mod common;

use common::{chain, prune};
use narytree::{RebalanceTrigger, Tree, TreeConfig};
use test_case::test_case;

#[test]
fn threshold_fires_exactly_once_in_150_adds() {
    let mut tree = Tree::create(Some(0usize), TreeConfig::default().with_threshold(100));
    let mut fired_at = Vec::new();

    let root = tree.root().expect("root").id();
    for i in 1..=150 {
        tree.add_child(root, i).expect("add");
        if i < 100 {
            assert!(!tree.needs_rebalancing(), "due early at mutation {i}");
        }
        if i == 100 {
            assert!(tree.needs_rebalancing());
        }
        if tree.auto_balance_if_needed().expect("rebalance") {
            fired_at.push(i);
        }
    }

    assert_eq!(fired_at, vec![100]);
    assert_eq!(tree.rebalance_count(), 1);
    assert_eq!(tree.mutations_since_rebalance(), 50);
}

#[test]
fn auto_rebalance_config_runs_inline() {
    let config = TreeConfig::default().with_threshold(100).with_auto_rebalance(true);
    let tree = chain(150, config);
    assert_eq!(tree.rebalance_count(), 1);
    assert_eq!(tree.mutations_since_rebalance(), 50);
    assert_eq!(tree.size(), 151);
}

#[test_case(1, 10 => 10 ; "every mutation")]
#[test_case(5, 12 => 2 ; "partial batch left over")]
#[test_case(100, 99 => 0 ; "never reached")]
#[test_case(100, 300 => 3 ; "default threshold")]
fn rebalance_frequency(threshold: usize, adds: usize) -> u64 {
    let config = TreeConfig::default().with_threshold(threshold).with_auto_rebalance(true);
    chain(adds, config).rebalance_count()
}

#[test_case(0 => 1 ; "zero clamps to one")]
#[test_case(1 => 1)]
#[test_case(250 => 250)]
fn threshold_is_clamped(threshold: usize) -> usize {
    let mut tree = chain(3, TreeConfig::default());
    tree.balance_tree(threshold).expect("balance");
    tree.rebalance_threshold()
}

#[test]
fn balance_tree_forces_and_resets() {
    let mut tree = chain(30, TreeConfig::default());
    assert!(!tree.needs_rebalancing());

    tree.balance_tree(10).expect("balance");
    assert_eq!(tree.rebalance_count(), 1);
    assert_eq!(tree.mutations_since_rebalance(), 0);
    assert_eq!(tree.config().rebalance_threshold, 10);

    let leaf = tree.find(|&d| d == 30).expect("leaf").id();
    let mut last = leaf;
    for i in 0..10 {
        last = tree.add_child(last, 100 + i).expect("add");
    }
    assert!(tree.needs_rebalancing());
}

#[test]
fn removals_count_as_mutations() {
    let mut tree = chain(20, TreeConfig::default().with_threshold(25));
    assert_eq!(tree.mutations_since_rebalance(), 20);

    // One removal per pruned subtree root, cascades count once
    prune(&mut tree, |&d| d == 15);
    assert_eq!(tree.mutations_since_rebalance(), 21);
    assert_eq!(tree.size(), 15);
}

#[test]
fn payload_edits_are_not_mutations() {
    let mut tree = chain(5, TreeConfig::default());
    let before = tree.mutations_since_rebalance();
    let mut root = tree.root_mut().expect("root");
    root.set_data(99);
    *root.data_mut() += 1;
    tree.set_root(7).expect("root");
    assert_eq!(tree.mutations_since_rebalance(), before);
}

#[test]
fn thorough_check_flags_skewed_chain() {
    let tree = chain(40, TreeConfig::default());
    assert!(!tree.needs_rebalancing());
    assert_eq!(tree.rebalance_due(), Some(RebalanceTrigger::Skew));
}

#[test]
fn rebuild_balanced_clears_skew() {
    let mut tree = chain(40, TreeConfig::default());
    tree.rebuild_balanced(3).expect("rebuild");
    assert_eq!(tree.size(), 41);
    assert_eq!(tree.rebalance_due(), None);
    assert_eq!(tree.depth(), Some(4));
    assert_eq!(tree.mutations_since_rebalance(), 0);
}
