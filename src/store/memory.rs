//! In-process store backend.
//!
//! [`MemoryStore`] keeps all records in a mutex-guarded map. It exists for
//! tests, benchmarks, and the bundled CLI; production deployments implement
//! [`Store`](super::Store) for their actual database instead. The lock is
//! only ever held for the map operation itself, never across an await
//! point.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{ShardKey, ShardRecord, Store, StoreError, StoreResult};

/// Map of counter name to that counter's shard records.
type Records = HashMap<String, HashMap<u32, i64>>;

/// An in-process [`Store`] implementation.
///
/// # Examples
///
/// ```rust
/// # use frantumi::store::{memory::MemoryStore, ShardKey, Store};
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), frantumi::store::StoreError> {
/// let store = MemoryStore::new();
/// let key = ShardKey::new("visits", 0);
///
/// store.put(&key, 0).await?;
/// store.increment(&key, 1).await?;
/// assert_eq!(store.get(&key).await?, 1);
/// # Ok(()) }
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, across all counters.
    pub fn len(&self) -> usize {
        self.guard().values().map(HashMap::len).sum()
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.guard().values().all(HashMap::is_empty)
    }

    fn guard(&self) -> MutexGuard<'_, Records> {
        // A panic while holding the lock cannot leave the map in a torn
        // state, so a poisoned guard is still usable.
        match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn put(&self, key: &ShardKey, value: i64) -> StoreResult<()> {
        self.guard()
            .entry(key.counter().to_string())
            .or_default()
            .insert(key.index(), value);
        Ok(())
    }

    async fn increment(&self, key: &ShardKey, delta: i64) -> StoreResult<()> {
        let mut records = self.guard();
        match records
            .get_mut(key.counter())
            .and_then(|shards| shards.get_mut(&key.index()))
        {
            Some(count) => {
                *count += delta;
                Ok(())
            }
            None => Err(StoreError::NotFound { key: key.clone() }),
        }
    }

    async fn get(&self, key: &ShardKey) -> StoreResult<i64> {
        self.guard()
            .get(key.counter())
            .and_then(|shards| shards.get(&key.index()))
            .copied()
            .ok_or_else(|| StoreError::NotFound { key: key.clone() })
    }

    async fn list_shards(&self, counter: &str) -> StoreResult<Vec<ShardRecord>> {
        Ok(self
            .guard()
            .get(counter)
            .map(|shards| {
                shards
                    .iter()
                    .map(|(&index, &count)| ShardRecord { index, count })
                    .collect()
            })
            .unwrap_or_default())
    }
}
