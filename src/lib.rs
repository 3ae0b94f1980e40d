//! # Frantumi - Distributed Sharded Counters
//!
//! A Rust library implementing the **sharded counter pattern** over an
//! external keyed document store. A logical counter is split into N
//! independent shard records so that many concurrent writers can increment
//! it without contending on a single hot record.
//!
//! ## The Problem
//!
//! Document and record stores cap the sustainable write rate of a single
//! key. A popular counter backed by one record hits that cap quickly: every
//! increment targets the same key, writes queue behind each other, and
//! throughput stops scaling no matter how many writers you add.
//!
//! ## The Solution: Sharded Counters
//!
//! This library splits each counter into N shard records. An increment
//! picks one shard uniformly at random and applies a server-side atomic
//! `+1` to it, so concurrent writers usually land on different records and
//! the per-key write limit multiplies by N. Reading the counter sums all
//! shards.
//!
//! ### Design Principles
//!
//! 1. **Random Shard Selection**: each increment draws its target shard
//!    from a process-wide uniform random source. The draw happens inside a
//!    minimal critical section that never covers store I/O, so unrelated
//!    increments proceed in parallel.
//!
//! 2. **Store-Side Atomicity**: increments use the store's atomic add
//!    primitive, never read-modify-write. Increments that collide on the
//!    same shard all take effect regardless of interleaving.
//!
//! 3. **Aggregation on Read**: the counter's value is the sum of its shard
//!    records at read time. Reads cost a listing of N records and observe
//!    an eventually consistent value, which is the right trade-off for
//!    counters that are written far more often than they are read.
//!
//! 4. **Store as a Trait**: the persistence backend is abstracted behind
//!    [`store::Store`], four operations any keyed document store can
//!    provide. [`store::memory::MemoryStore`] ships for tests and local
//!    runs.
//!
//! ## Quick Start
//!
//! ```rust
//! # use std::num::NonZeroU32;
//! # use std::sync::Arc;
//! use frantumi::counter::ShardedCounter;
//! use frantumi::store::memory::MemoryStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> frantumi::error::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let visits = ShardedCounter::new(store, "page_visits")?;
//! let shards = NonZeroU32::new(10).unwrap();
//!
//! // Create the shard set once per counter.
//! visits.initialize(shards).await?;
//!
//! // Increment from any number of concurrent tasks.
//! visits.increment(shards).await?;
//! visits.increment(shards).await?;
//!
//! // Read the total value (aggregates all shards).
//! assert_eq!(visits.total().await?, 2);
//! # Ok(()) }
//! ```
//!
//! ## Consistency
//!
//! The counter is eventually consistent. [`total`](counter::ShardedCounter::total)
//! reads each shard at its own instant, so increments in flight during the
//! read may or may not be included. Once all increments have completed the
//! total is exact, and no completed increment is ever lost.
//!
//! The shard count is fixed at initialization and must be supplied again
//! on every increment. It is not persisted or reconciled; passing a larger
//! count than the counter was created with surfaces as a
//! shard-not-found error whenever the draw lands on a missing record.
//!
//! ## Choosing a Shard Count
//!
//! N multiplies the counter's write capacity and also the cost of every
//! read. Pick the smallest N that keeps each shard under the store's
//! per-key write limit at your peak increment rate. N cannot be changed
//! later without re-initializing the counter, which resets it.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | [`snapshot`] module with serializable per-shard captures |
//! | `json` | JSON rendering of snapshots via `serde_json` |
//! | `cli` | The `frantumi` binary for exercising counters locally |
//! | `full` | All of the above |

pub mod counter;
pub mod error;
pub mod picker;
pub mod store;

#[cfg(feature = "serde")]
pub mod snapshot;
