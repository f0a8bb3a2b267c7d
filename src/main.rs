use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use narytree::{LayoutOrder, NodeId, Tree, TreeConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "narytree", about = "Succinct arena-backed N-ary trees")]
struct Cli {
    /// Log relocation and policy events (same as RUST_LOG=narytree=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a tree from an indented outline and print its statistics.
    Inspect {
        /// Outline file: one node per line, two spaces per level.
        outline: PathBuf,
        /// Slot order used by rebalancing (dfs or bfs).
        #[arg(long, default_value = "dfs")]
        layout: LayoutOrder,
        /// Rebalance once before reporting.
        #[arg(long)]
        rebalance: bool,
        /// Write the structure bits in wire format to this file.
        #[arg(long)]
        encode_to: Option<PathBuf>,
    },
    /// Grow a random tree with lazy rebalancing and report how it went.
    Stress {
        /// Nodes to insert below the root.
        #[arg(long, default_value_t = 10_000)]
        nodes: usize,
        /// Mutations between lazy rebalances.
        #[arg(long, default_value_t = 100)]
        threshold: usize,
        /// Slot order used by rebalancing (dfs or bfs).
        #[arg(long, default_value = "dfs")]
        layout: LayoutOrder,
        /// Remove a random subtree after every this many inserts (0 = never).
        #[arg(long, default_value_t = 0)]
        remove_every: usize,
        /// Seed for the insertion pattern.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Inspect {
            outline,
            layout,
            rebalance,
            encode_to,
        } => run_inspect(outline, layout, rebalance, encode_to)?,
        Commands::Stress {
            nodes,
            threshold,
            layout,
            remove_every,
            seed,
        } => run_stress(nodes, threshold, layout, remove_every, seed)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "narytree=debug" } else { "narytree=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_inspect(
    outline_path: PathBuf,
    layout: LayoutOrder,
    rebalance: bool,
    encode_to: Option<PathBuf>,
) -> Result<()> {
    let outline = fs::read_to_string(&outline_path)
        .with_context(|| format!("failed to read outline {}", outline_path.display()))?;
    let config = TreeConfig::default().with_layout(layout);
    let mut tree = parse_outline(&outline, config)
        .with_context(|| format!("invalid outline {}", outline_path.display()))?;

    if rebalance {
        let outcome = tree.rebalance_for_locality()?;
        println!(
            "Rebalanced: moved {} nodes, score {:.4} -> {:.4}",
            outcome.moved, outcome.score_before, outcome.score_after
        );
    }

    println!("{}", tree.statistics().report());
    let memory = tree.memory_stats();
    println!(
        "Memory: {} bytes in arena, {} payload, {} overhead ({:.1} bytes/node)",
        memory.arena_bytes, memory.payload_bytes, memory.overhead_bytes, memory.bytes_per_node
    );
    println!("{}", tree.locality_statistics());

    let encoding = tree.encode_succinct_with(|_| ());
    println!("Structure: {}", encoding);
    println!("Fingerprint: {}", encoding.fingerprint().to_hex());

    if let Some(path) = encode_to {
        let bytes = encoding.structure_to_bytes();
        fs::write(&path, &bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote {} bytes to {}", bytes.len(), path.display());
    }

    Ok(())
}

/// Outline lines become nodes; leading spaces / 2 is the depth.
fn parse_outline(outline: &str, config: TreeConfig) -> Result<Tree<String>> {
    let mut tree = Tree::with_config(config);
    let mut path: Vec<NodeId> = Vec::new();

    for (line_no, line) in outline.lines().enumerate() {
        let label = line.trim_start();
        if label.is_empty() {
            continue;
        }
        let indent = line.len() - label.len();
        if indent % 2 != 0 {
            bail!("odd indentation on line {}", line_no + 1);
        }
        let depth = indent / 2;
        if depth > path.len() || (depth == 0 && !path.is_empty()) {
            bail!("line {} does not attach to a parent", line_no + 1);
        }
        path.truncate(depth);

        let id = match path.last() {
            None => {
                tree.set_root(label.trim_end().to_string())?;
                tree.root()?.id()
            }
            Some(&parent) => tree.add_child(parent, label.trim_end().to_string())?,
        };
        path.push(id);
    }

    Ok(tree)
}

fn run_stress(
    nodes: usize,
    threshold: usize,
    layout: LayoutOrder,
    remove_every: usize,
    seed: u64,
) -> Result<()> {
    let config = TreeConfig::default()
        .with_threshold(threshold)
        .with_layout(layout)
        .with_auto_rebalance(true);
    let mut tree = Tree::create(Some(0u64), config);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut removed = 0usize;

    for i in 1..=nodes as u64 {
        let parent = random_descent(&tree, &mut rng)?;
        tree.add_child(parent, i)?;

        if remove_every > 0 && i as usize % remove_every == 0 {
            let victim = random_descent(&tree, &mut rng)?;
            if !tree.node(victim)?.is_root() {
                removed += tree.remove(victim)?.len();
            }
        }
    }

    let stats = tree.statistics();
    println!(
        "Inserted {} nodes, removed {}, final size {}",
        nodes, removed, stats.size
    );
    println!(
        "Rebalances: {} (threshold {}, {} mutations pending)",
        stats.rebalance_count,
        tree.rebalance_threshold(),
        tree.mutations_since_rebalance()
    );
    println!("{}", tree.locality_statistics());
    Ok(())
}

/// Walk down from the root, stopping at a leaf or with probability 1/3.
fn random_descent<R: Rng>(tree: &Tree<u64>, rng: &mut R) -> Result<NodeId> {
    let mut node = tree.root()?;
    while !node.is_leaf() && rng.gen_range(0..3) != 0 {
        node = node.child(rng.gen_range(0..node.child_count()))?;
    }
    Ok(node.id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outline() {
        let tree = parse_outline("root\n  a\n    a1\n  b\n", TreeConfig::default()).unwrap();
        assert_eq!(tree.size(), 4);
        assert_eq!(tree.depth(), Some(2));
        let names: Vec<_> = tree.preorder().map(|n| n.data().clone()).collect();
        assert_eq!(names, vec!["root", "a", "a1", "b"]);
    }

    #[test]
    fn test_random_descent_is_seeded() {
        let mut tree = Tree::with_root(0u64);
        let root = tree.root().unwrap().id();
        let a = tree.add_child(root, 1).unwrap();
        tree.add_child(a, 2).unwrap();
        tree.add_child(a, 3).unwrap();
        tree.add_child(root, 4).unwrap();
        let walk = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..20)
                .map(|_| random_descent(&tree, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(walk(7), walk(7));
        assert!(walk(7).iter().all(|&id| tree.node(id).is_ok()));
    }

    #[test]
    fn test_parse_outline_rejects_orphans() {
        assert!(parse_outline("root\n    deep\n", TreeConfig::default()).is_err());
        assert!(parse_outline("root\nsecond\n", TreeConfig::default()).is_err());
        assert!(parse_outline("root\n a\n", TreeConfig::default()).is_err());
    }
}
