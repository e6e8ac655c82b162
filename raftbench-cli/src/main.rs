//! Raftbench CLI - bring up a Raft KV cluster and drive load against it.
//!
//! ```bash
//! # Build (if needed), launch and wire a 3-node cluster
//! raftbench cluster start
//!
//! # Check who is leading
//! raftbench cluster status
//!
//! # Sequential benchmark suite against the current leader
//! raftbench bench -n 100
//!
//! # Concurrent PUT flood
//! raftbench flood -n 500 -j 20
//!
//! # Tear everything down
//! raftbench cluster stop
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "raftbench",
    about = "Raft KV cluster bootstrap and benchmarking harness",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster lifecycle commands
    Cluster {
        #[command(subcommand)]
        action: ClusterAction,
    },
    /// Sequential benchmark suite: PUT, GET, then mixed read-after-write
    Bench {
        /// Number of operations per suite
        #[arg(short = 'n', long, default_value = "100")]
        num_ops: usize,

        /// Warmup operations before measuring
        #[arg(long, default_value = "10")]
        warmup: usize,

        /// Explicit target URL; defaults to whichever node claims leadership
        #[arg(short, long)]
        target: Option<String>,

        /// First control port of the cluster to probe for a leader
        #[arg(short, long, default_value = "8080")]
        base_port: u16,

        /// Cluster size
        #[arg(long, default_value = "3")]
        nodes: u64,
    },
    /// Concurrent PUT flood against the leader
    Flood {
        /// Number of operations
        #[arg(short = 'n', long, default_value = "100")]
        num_ops: usize,

        /// Concurrency level
        #[arg(short = 'j', long, default_value = "10")]
        concurrency: usize,

        /// Warmup operations before measuring
        #[arg(long, default_value = "10")]
        warmup: usize,

        /// Explicit target URL; defaults to whichever node claims leadership
        #[arg(short, long)]
        target: Option<String>,

        /// First control port of the cluster to probe for a leader
        #[arg(short, long, default_value = "8080")]
        base_port: u16,

        /// Cluster size
        #[arg(long, default_value = "3")]
        nodes: u64,
    },
}

#[derive(Subcommand)]
enum ClusterAction {
    /// Build (if needed), launch and wire a full cluster, then wait for a leader
    Start {
        /// First control port; node N listens on base_port + N
        #[arg(short, long, default_value = "8080")]
        base_port: u16,

        /// Cluster size
        #[arg(short, long, default_value = "3")]
        nodes: u64,

        /// Worker binary to launch for each node
        #[arg(long, default_value = "raft-node/raft-node")]
        binary: String,

        /// Command that builds the worker binary when it is missing
        #[arg(long)]
        build_cmd: Option<String>,
    },
    /// Stop all worker processes
    Stop {
        /// Process pattern to kill
        #[arg(long, default_value = "raft-node --node-id")]
        pattern: String,
    },
    /// Poll every node for liveness and role
    Status {
        /// First control port of the cluster
        #[arg(short, long, default_value = "8080")]
        base_port: u16,

        /// Cluster size
        #[arg(short, long, default_value = "3")]
        nodes: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Cluster { action } => match action {
            ClusterAction::Start { base_port, nodes, binary, build_cmd } => {
                commands::cluster::start(base_port, nodes, &binary, build_cmd.as_deref()).await
            }
            ClusterAction::Stop { pattern } => commands::cluster::stop(&pattern).await,
            ClusterAction::Status { base_port, nodes } => {
                commands::cluster::status(base_port, nodes).await
            }
        },
        Commands::Bench { num_ops, warmup, target, base_port, nodes } => {
            commands::bench::run_suite(num_ops, warmup, target, base_port, nodes).await
        }
        Commands::Flood { num_ops, concurrency, warmup, target, base_port, nodes } => {
            commands::bench::flood(num_ops, concurrency, warmup, target, base_port, nodes).await
        }
    }
}
