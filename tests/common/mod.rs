#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use narytree::{NodeId, Tree, TreeConfig};

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("NARYTREE_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set NARYTREE_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n").trim_end().to_string()
}

/// root with child_0..child_2; child_0 holds grandchild_0 and grandchild_1
pub fn scenario_a() -> Tree<String> {
    let mut tree = Tree::with_root("root".to_string());
    let root = tree.root().expect("root").id();
    let first = tree.add_child(root, "child_0".to_string()).expect("add");
    tree.add_child(root, "child_1".to_string()).expect("add");
    tree.add_child(root, "child_2".to_string()).expect("add");
    tree.add_child(first, "grandchild_0".to_string()).expect("add");
    tree.add_child(first, "grandchild_1".to_string()).expect("add");
    tree
}

/// Root plus `len` nodes, each the only child of the previous one
pub fn chain(len: usize, config: TreeConfig) -> Tree<usize> {
    let mut tree = Tree::create(Some(0), config);
    let mut last = tree.root().expect("root").id();
    for i in 1..=len {
        last = tree.add_child(last, i).expect("add");
    }
    tree
}

/// Root with `fanout` children, each with `fanout` children
pub fn bushy(fanout: usize) -> Tree<usize> {
    let mut tree = Tree::with_root(0);
    let root = tree.root().expect("root").id();
    let mut next = 1;
    let children: Vec<NodeId> = (0..fanout)
        .map(|_| {
            let id = tree.add_child(root, next).expect("add");
            next += 1;
            id
        })
        .collect();
    for child in children {
        for _ in 0..fanout {
            tree.add_child(child, next).expect("add");
            next += 1;
        }
    }
    tree
}

/// Shape produced by a parent-choice sequence: node i+1 attaches to the
/// node numbered `choices[i] % (i + 1)`
pub fn from_parent_choices(choices: &[usize]) -> Tree<u32> {
    from_parent_choices_with(choices, TreeConfig::default())
}

pub fn from_parent_choices_with(choices: &[usize], config: TreeConfig) -> Tree<u32> {
    let mut tree = Tree::create(Some(0u32), config);
    let mut ids = vec![tree.root().expect("root").id()];
    for (i, &choice) in choices.iter().enumerate() {
        let parent = ids[choice % ids.len()];
        ids.push(tree.add_child(parent, i as u32 + 1).expect("add"));
    }
    tree
}

/// Remove every node whose payload satisfies `doomed`, leaves first
///
/// Postorder removes each victim before any doomed ancestor, so every
/// handle is still live when its turn comes. Needs `auto_rebalance` off.
pub fn prune<T>(tree: &mut Tree<T>, mut doomed: impl FnMut(&T) -> bool) {
    let victims: Vec<NodeId> = tree
        .postorder()
        .filter(|node| !node.is_root() && doomed(node.data()))
        .map(|node| node.id())
        .collect();
    for id in victims {
        tree.remove(id).expect("remove");
    }
}
