//! Snapshot types for serializing counter state.
//!
//! A snapshot captures a counter's per-shard breakdown and total as
//! observed at read time. Snapshots are plain data: they can be logged,
//! stored, or sent over an API in any serde-compatible format.
//!
//! # Feature Flag
//!
//! This module requires the `serde` feature:
//!
//! ```toml
//! [dependencies]
//! frantumi = { version = "0.3", features = ["serde"] }
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use frantumi::snapshot::CounterSnapshot;
//!
//! let snapshot = CounterSnapshot::capture(&counter).await?;
//! println!("{}", serde_json::to_string_pretty(&snapshot)?);
//! ```

use serde::{Deserialize, Serialize};

use crate::counter::ShardedCounter;
use crate::error::Result;
use crate::store::{ShardRecord, Store};

/// A point-in-time capture of one counter's shard set.
///
/// The usual consistency caveat applies: each shard's count was read at
/// its own instant, so a snapshot taken while increments are in flight is
/// approximate. `total` is always the sum of the captured `shards`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Name of the captured counter.
    pub name: String,
    /// Sum of the captured shard counts.
    pub total: i64,
    /// The captured shard records, sorted by index.
    pub shards: Vec<ShardRecord>,
}

impl CounterSnapshot {
    /// Builds a snapshot from already-read shard records.
    ///
    /// The records are sorted by index and the total is computed from
    /// them.
    pub fn new(name: impl Into<String>, mut shards: Vec<ShardRecord>) -> Self {
        shards.sort_by_key(|record| record.index);
        let total = shards.iter().map(|record| record.count).sum();
        Self {
            name: name.into(),
            total,
            shards,
        }
    }

    /// Captures the current state of a live counter.
    pub async fn capture<S: Store>(counter: &ShardedCounter<S>) -> Result<Self> {
        let shards = counter.read_shards().await?;
        Ok(Self::new(counter.name(), shards))
    }

    /// Looks up the captured record for a shard index.
    pub fn get(&self, index: u32) -> Option<&ShardRecord> {
        self.shards.iter().find(|record| record.index == index)
    }
}
