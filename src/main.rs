//! mtree CLI - inspect merkle configuration trees from the command line
//!
//! Trees are built from flat `dotted.path=value` assignments, applied in
//! order. Nothing is read from disk.

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use merkle_config::{
    detect_change, diff_trees, BytesSerializer, Change, DigestAlgorithm, MerkleTree, Path,
    SubtreeChange,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mtree")]
#[command(about = "Inspect merkle configuration trees built from dotted path assignments")]
#[command(version)]
struct Cli {
    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Hash algorithm (blake3 or sha256)
    #[arg(short, long, default_value = "blake3")]
    digest: DigestAlgorithm,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the root hash and every entry with its node hash
    Hash {
        /// Assignments such as collector.listenPort=8080
        assignments: Vec<String>,
    },

    /// Show the value and subtree hash at a path
    Get {
        /// Dotted path to look up
        #[arg(short, long)]
        path: String,
        /// Assignments such as collector.listenPort=8080
        assignments: Vec<String>,
    },

    /// Compare two trees
    Diff {
        /// Assignments for the old tree
        #[arg(long, num_args = 0..)]
        old: Vec<String>,
        /// Assignments for the new tree
        #[arg(long, num_args = 0..)]
        new: Vec<String>,
        /// Report whether the subtree at this dotted path changed
        #[arg(short, long)]
        watch: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MTREE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        output(
            &cli.format,
            &serde_json::json!({
                "status": "error",
                "message": err.to_string()
            }),
        )?;
        std::process::exit(1);
    }
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Hash { assignments } => {
            let tree = build_tree(cli.digest, assignments)?;
            let entries: Vec<_> = tree
                .entries()
                .into_iter()
                .map(|(path, value)| {
                    serde_json::json!({
                        "path": path.to_string(),
                        "value": value,
                        "hash": tree.hash_of(path.segments()).map(|h| h.to_hex())
                    })
                })
                .collect();
            output(
                &cli.format,
                &serde_json::json!({
                    "algorithm": cli.digest.name(),
                    "root": tree.hash().to_hex(),
                    "entries": entries
                }),
            )?;
        }

        Commands::Get { path, assignments } => {
            let tree = build_tree(cli.digest, assignments)?;
            let path = Path::parse_dotted(path);
            let Some(subtree) = tree.subtree(path.segments()) else {
                bail!("Path not found: {}", path);
            };
            output(
                &cli.format,
                &serde_json::json!({
                    "path": path.to_string(),
                    "value": subtree.value(),
                    "hash": subtree.hash().to_hex(),
                    "entries": subtree.len()
                }),
            )?;
        }

        Commands::Diff { old, new, watch } => {
            let old_tree = build_tree(cli.digest, old)?;
            let new_tree = build_tree(cli.digest, new)?;
            let diff = diff_trees(&old_tree, &new_tree);

            let entries: Vec<_> = diff
                .entries
                .iter()
                .map(|entry| {
                    serde_json::json!({
                        "kind": entry.kind(),
                        "path": entry.path().to_string()
                    })
                })
                .collect();

            let watch = watch.as_deref().map(|dotted| {
                let path = Path::parse_dotted(dotted);
                let (status, hash) =
                    match detect_change(Some(&old_tree), &new_tree, path.segments()) {
                        Change::Unchanged => ("unchanged", new_tree.hash_of(path.segments())),
                        Change::Changed(SubtreeChange::Present(subtree)) => {
                            ("changed", Some(subtree.hash()))
                        }
                        Change::Changed(SubtreeChange::Absent) => ("removed", None),
                    };
                serde_json::json!({
                    "path": path.to_string(),
                    "status": status,
                    "hash": hash.map(|h| h.to_hex())
                })
            });

            output(
                &cli.format,
                &serde_json::json!({
                    "root_changed": old_tree.hash() != new_tree.hash(),
                    "added": diff.added_count(),
                    "removed": diff.removed_count(),
                    "modified": diff.modified_count(),
                    "entries": entries,
                    "watch": watch
                }),
            )?;
        }
    }

    Ok(())
}

fn build_tree(
    algorithm: DigestAlgorithm,
    assignments: &[String],
) -> anyhow::Result<MerkleTree<String>> {
    let mut tree = MerkleTree::empty_with_algorithm(algorithm, BytesSerializer);
    for assignment in assignments {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid assignment (expected path=value): {}", assignment))?;
        let path = Path::parse_dotted(key);
        tree = tree.add(value.to_string(), path.segments())?;
        debug!(path = %path, root = %tree.hash().short(), "applied assignment");
    }
    Ok(tree)
}

fn output(format: &OutputFormat, value: &serde_json::Value) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(value)?);
        }
        OutputFormat::Text => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}
