//! Command-line harness for exercising distributed counters.
//!
//! Run with:
//! ```bash
//! cargo run --features cli -- test-distributed-counter visits --shards 100
//! ```
//!
//! Counters live in an in-process [`MemoryStore`], so this binary is a
//! local playground for the pattern rather than a client for a deployed
//! backend.

use std::num::NonZeroU32;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use futures::future::join_all;
use tracing_subscriber::EnvFilter;

use frantumi::counter::ShardedCounter;
use frantumi::error::Result;
use frantumi::snapshot::CounterSnapshot;
use frantumi::store::memory::MemoryStore;

/// Exercise sharded counters backed by an in-process store.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Namespace the counter lives under
    #[arg(long, default_value = "counters")]
    namespace: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a counter's shard set, every shard starting at zero
    InitializeDistributedCounter {
        /// Counter name
        counter: String,

        /// Number of shards to create
        #[arg(short, long, default_value = "100")]
        shards: NonZeroU32,
    },

    /// Initialize a counter, apply increments, and read it back with
    /// timings
    TestDistributedCounter {
        /// Counter name
        counter: String,

        /// Number of shards to create
        #[arg(short, long, default_value = "100")]
        shards: NonZeroU32,

        /// Number of increments to apply, all dispatched concurrently
        #[arg(short, long, default_value = "10")]
        increments: u32,

        /// Print the final per-shard breakdown as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let store = Arc::new(MemoryStore::new());

    match cli.command {
        Command::InitializeDistributedCounter { counter, shards } => {
            let name = format!("{}/{}", cli.namespace, counter);
            let counter = ShardedCounter::new(store, name)?;

            let start = Instant::now();
            counter.initialize(shards).await?;
            println!(
                "initialized counter \"{}\" with {} shards in {:.3?}",
                counter.name(),
                shards,
                start.elapsed()
            );
        }

        Command::TestDistributedCounter {
            counter,
            shards,
            increments,
            json,
        } => {
            let name = format!("{}/{}", cli.namespace, counter);
            let counter = ShardedCounter::new(store, name)?;

            let start = Instant::now();
            counter.initialize(shards).await?;
            println!(
                "initialized counter \"{}\" with {} shards in {:.3?}",
                counter.name(),
                shards,
                start.elapsed()
            );

            let start = Instant::now();
            let outcomes = join_all((0..increments).map(|_| counter.increment(shards))).await;
            for outcome in outcomes {
                outcome?;
            }
            let elapsed = start.elapsed();
            println!(
                "applied {} increments in {:.3?} ({:.3?} per increment)",
                increments,
                elapsed,
                elapsed / increments.max(1)
            );

            let start = Instant::now();
            let total = counter.total().await?;
            println!("read total {} in {:.3?}", total, start.elapsed());

            if json {
                let snapshot = CounterSnapshot::capture(&counter).await?;
                let rendered = serde_json::to_string_pretty(&snapshot)
                    .unwrap_or_else(|err| format!("Error: {err}"));
                println!("{rendered}");
            }
        }
    }

    Ok(())
}
