//! Outliner operator tool
//!
//! # Commands
//!
//! - `check-cycles`: audit parent pointers for cycles, optionally repairing them
//! - `tree`: print one owner's forest as an indented tree
//!
//! The database comes from `OUTLINER_DB_PATH` (see `OutlinerConfig::from_env`)
//! unless `--db` is given. Exit code 0 on success, 1 on unresolved cycles or
//! any error.

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use outliner_core::operations::ForestIndex;
use outliner_core::{Node, NodeId, NodeService, OutlinerConfig, OwnerId};
use std::collections::HashSet;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

/// Outliner administration: cycle audit and forest inspection
#[derive(Parser)]
#[command(name = "outliner-admin")]
#[command(version)]
#[command(about = "Maintenance commands for the outliner database")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Database file
    #[arg(long, global = true, env = "OUTLINER_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check for circular parent chains
    ///
    /// A cycle is a node whose parent is one of its own descendants. With
    /// `--fix` the offending node of each cycle becomes a root, appended
    /// after the owner's existing roots.
    CheckCycles(CheckCyclesArgs),
    /// Print an owner's forest as an indented tree
    Tree(TreeArgs),
}

#[derive(Args)]
struct CheckCyclesArgs {
    /// Only check this owner's nodes
    #[arg(long)]
    owner_id: Option<OwnerId>,

    /// Detach each offending node from its parent
    #[arg(long)]
    fix: bool,

    /// Emit machine-readable JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TreeArgs {
    #[arg(long)]
    owner_id: OwnerId,

    /// Ignore the owner's lock and show mode, print every node
    #[arg(long)]
    all: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> Result<i32> {
    let mut config = OutlinerConfig::from_env().map_err(|e| anyhow!(e))?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    config.validate().map_err(|e| anyhow!(e))?;

    tracing::debug!("Opening database at {}", config.database_path.display());
    let service = NodeService::open(&config).await?;

    match cli.command {
        Commands::CheckCycles(args) => check_cycles(&service, args).await,
        Commands::Tree(args) => print_tree(&service, args).await,
    }
}

async fn check_cycles(service: &NodeService, args: CheckCyclesArgs) -> Result<i32> {
    let cycles = service.detect_cycles(args.owner_id).await?;

    let fixed = if args.fix && !cycles.is_empty() {
        service.repair_cycles(args.owner_id).await?
    } else {
        Vec::new()
    };

    let remaining = if args.fix && !cycles.is_empty() {
        service.detect_cycles(args.owner_id).await?.len()
    } else {
        cycles.len()
    };

    if args.json {
        let report = serde_json::json!({
            "cycles": cycles,
            "fixed": fixed,
            "remaining": remaining,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if remaining == 0 { 0 } else { 1 });
    }

    if cycles.is_empty() {
        println!("No circular parent chains found.");
        return Ok(0);
    }

    println!("Found {} cycle(s):", cycles.len());
    for (index, cycle) in cycles.iter().enumerate() {
        println!();
        println!("Cycle #{} (owner {})", index + 1, cycle.owner_id);
        println!(
            "  Node {} has parent {}, which is one of its descendants",
            cycle.node_id, cycle.parent_id
        );
        println!("  Path: {}", cycle);
    }

    if args.fix {
        println!();
        for node in &fixed {
            println!(
                "Fixed: node {} is now a root (was under {})",
                node.node_id, node.previous_parent_id
            );
        }
        if remaining > 0 {
            println!("{} cycle(s) remain after repair", remaining);
        }
    } else {
        println!();
        println!("Run with --fix to detach the offending nodes.");
    }

    Ok(if remaining == 0 { 0 } else { 1 })
}

async fn print_tree(service: &NodeService, args: TreeArgs) -> Result<i32> {
    let nodes = if args.all {
        service.list_nodes(args.owner_id, None).await?
    } else {
        service.visible_forest(args.owner_id).await?
    };

    if nodes.is_empty() {
        println!("Owner {} has no nodes to show.", args.owner_id);
        return Ok(0);
    }

    let index = ForestIndex::new(&nodes);
    let present: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();

    // A locked view starts below the real roots, so anything whose parent is
    // not in the set is drawn at the top level.
    let mut tops: Vec<&Node> = nodes
        .iter()
        .filter(|n| n.parent_id.map_or(true, |p| !present.contains(&p)))
        .collect();
    tops.sort_by_key(|n| n.sibling_sort_key());

    let mut printed = HashSet::new();
    for top in tops {
        for (depth, node) in index.walk(args.owner_id, Some(top.id)) {
            if printed.insert(node.id) {
                println!("{}{}", "  ".repeat(depth), render(node));
            }
        }
    }

    let unreachable: Vec<&Node> = nodes.iter().filter(|n| !printed.contains(&n.id)).collect();
    if !unreachable.is_empty() {
        println!();
        println!("Unreachable from any root (run check-cycles):");
        for node in unreachable {
            println!("  {}", render(node));
        }
    }

    Ok(0)
}

fn render(node: &Node) -> String {
    let mut line = format!(
        "{} {} (#{}",
        if node.completed { "[x]" } else { "[ ]" },
        node.title,
        node.id
    );
    if let Some(order) = node.order {
        line.push_str(&format!(", order {}", order));
    }
    line.push(')');
    if node.archived {
        line.push_str(" [archived]");
    }
    line
}
