//! The distributed sharded counter.
//!
//! A logical counter is stored as N independent shard records in the
//! backing store, one per index in `[0, N)`. Writers increment one shard
//! chosen at random, so concurrent increments land on different records
//! most of the time and never contend on a single hot key. Readers sum
//! whatever shard records exist.
//!
//! ```text
//!                        ┌──────────────────────────────┐
//!                        │        counter "visits"      │
//!                        ├──────────────────────────────┤
//!   writer ──+1──►       │ visits/shards/0   count: 41  │
//!   writer ──+1──►       │ visits/shards/1   count: 37  │
//!   writer ──+1──►       │ visits/shards/2   count: 45  │
//!        ...             │    ...                       │
//!                        └──────────────────────────────┘
//!                                       │
//!                                       ▼
//!                             total() sums all shard
//!                             records on read
//! ```
//!
//! The trade-off is the mirror image of a single-record counter: writes
//! scale with the shard count, while reads pay for one listing of N
//! records and observe an eventually consistent value. That is the right
//! shape for counters that are written far more often than they are read.

use std::num::NonZeroU32;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, trace};

use crate::error::{CounterError, Result};
use crate::picker::{self, ShardPicker};
use crate::store::{ShardKey, ShardRecord, Store, StoreError};

/// A handle to one distributed counter in a store.
///
/// The handle itself holds no counter state. Every operation round-trips
/// to the store, so any number of handles in any number of processes can
/// operate on the same counter concurrently with no coordination beyond
/// what the store provides per record.
///
/// The shard count is fixed when [`initialize`](Self::initialize) creates
/// the shard set and must be passed again to every
/// [`increment`](Self::increment). It is not persisted or verified; a
/// caller that passes a larger count than the counter was created with
/// gets a [`CounterError::ShardNotFound`] whenever the draw lands on a
/// missing shard. [`shards`](Self::shards) reports how many shard records
/// actually exist.
///
/// # Examples
///
/// ```rust
/// # use std::num::NonZeroU32;
/// # use std::sync::Arc;
/// # use frantumi::counter::ShardedCounter;
/// # use frantumi::store::memory::MemoryStore;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> frantumi::error::Result<()> {
/// let store = Arc::new(MemoryStore::new());
/// let visits = ShardedCounter::new(store, "page_visits")?;
/// let shards = NonZeroU32::new(10).unwrap();
///
/// visits.initialize(shards).await?;
/// visits.increment(shards).await?;
/// visits.increment(shards).await?;
///
/// assert_eq!(visits.total().await?, 2);
/// # Ok(()) }
/// ```
///
/// Cloning the handle is cheap and lets concurrent tasks share it:
///
/// ```rust
/// # use std::num::NonZeroU32;
/// # use std::sync::Arc;
/// # use frantumi::counter::ShardedCounter;
/// # use frantumi::store::memory::MemoryStore;
/// # #[tokio::main]
/// # async fn main() -> frantumi::error::Result<()> {
/// let store = Arc::new(MemoryStore::new());
/// let counter = ShardedCounter::new(store, "jobs")?;
/// let shards = NonZeroU32::new(16).unwrap();
/// counter.initialize(shards).await?;
///
/// let mut handles = vec![];
/// for _ in 0..4 {
///     let counter = counter.clone();
///     handles.push(tokio::spawn(async move {
///         for _ in 0..25 {
///             counter.increment(shards).await.unwrap();
///         }
///     }));
/// }
/// for handle in handles {
///     handle.await.unwrap();
/// }
///
/// assert_eq!(counter.total().await?, 100);
/// # Ok(()) }
/// ```
pub struct ShardedCounter<S> {
    store: Arc<S>,
    name: String,
    picker: Arc<ShardPicker>,
}

impl<S> ShardedCounter<S> {
    /// Creates a handle to the named counter in `store`.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::EmptyName`] if `name` is empty. No store
    /// interaction happens here.
    pub fn new(store: Arc<S>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(CounterError::EmptyName);
        }
        Ok(Self {
            store,
            name,
            picker: picker::shared(),
        })
    }

    /// Replaces the process-wide shard picker with a specific one,
    /// returning `self` for method chaining.
    ///
    /// Mainly useful with [`ShardPicker::with_seed`] to make shard
    /// selection reproducible in tests.
    pub fn with_picker(mut self, picker: Arc<ShardPicker>) -> Self {
        self.picker = picker;
        self
    }

    /// Name of the counter this handle operates on.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S: Store> ShardedCounter<S> {
    /// Creates the counter's shard set: one record per index in
    /// `[0, shards)`, each starting at zero.
    ///
    /// All writes are dispatched concurrently and jointly awaited. The
    /// call succeeds only once every write has succeeded.
    ///
    /// Re-initializing an existing counter overwrites its shards back to
    /// zero. This is a reset, not a no-op. Re-initializing with a smaller
    /// count than before only resets `[0, shards)` and leaves the records
    /// above that range in place, so the counter's total still includes
    /// them; recover from that state by initializing again with a count at
    /// least as large as the original.
    ///
    /// # Errors
    ///
    /// If any write fails the whole call fails with that store error.
    /// Writes that already completed are not rolled back; the shard set is
    /// left as some subset of `[0, shards)` and a subsequent successful
    /// `initialize` repairs it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::num::NonZeroU32;
    /// # use std::sync::Arc;
    /// # use frantumi::counter::ShardedCounter;
    /// # use frantumi::store::memory::MemoryStore;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> frantumi::error::Result<()> {
    /// let counter = ShardedCounter::new(Arc::new(MemoryStore::new()), "downloads")?;
    /// counter.initialize(NonZeroU32::new(100).unwrap()).await?;
    /// assert_eq!(counter.total().await?, 0);
    /// # Ok(()) }
    /// ```
    pub async fn initialize(&self, shards: NonZeroU32) -> Result<()> {
        let writes = (0..shards.get()).map(|index| {
            let key = ShardKey::new(self.name.as_str(), index);
            async move { self.store.put(&key, 0).await }
        });

        for outcome in join_all(writes).await {
            outcome?;
        }

        debug!(
            counter = %self.name,
            shards = shards.get(),
            "shard set initialized"
        );
        Ok(())
    }

    /// Adds one to the counter by incrementing a shard chosen uniformly at
    /// random from `[0, shards)`.
    ///
    /// The addition is applied atomically by the store, so increments that
    /// collide on the same shard all take effect regardless of
    /// interleaving. On success, exactly one shard's count has grown by
    /// one and the counter's total has grown by one.
    ///
    /// `shards` must match the count the counter was initialized with.
    ///
    /// # Errors
    ///
    /// Returns [`CounterError::ShardNotFound`] if the chosen shard has no
    /// record, which is what a stale or oversized `shards` argument looks
    /// like. A failed increment has no effect on any shard.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::num::NonZeroU32;
    /// # use std::sync::Arc;
    /// # use frantumi::counter::ShardedCounter;
    /// # use frantumi::store::memory::MemoryStore;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> frantumi::error::Result<()> {
    /// let counter = ShardedCounter::new(Arc::new(MemoryStore::new()), "downloads")?;
    /// let shards = NonZeroU32::new(20).unwrap();
    /// counter.initialize(shards).await?;
    ///
    /// for _ in 0..5 {
    ///     counter.increment(shards).await?;
    /// }
    /// assert_eq!(counter.total().await?, 5);
    /// # Ok(()) }
    /// ```
    pub async fn increment(&self, shards: NonZeroU32) -> Result<()> {
        let index = self.picker.next_index(shards);
        let key = ShardKey::new(self.name.as_str(), index);
        trace!(counter = %self.name, index, "incrementing shard");

        match self.store.increment(&key, 1).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound { .. }) => Err(CounterError::ShardNotFound {
                counter: self.name.clone(),
                index,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the counter's value: the sum of every shard record that
    /// currently exists under it.
    ///
    /// No shard count is needed; the call discovers whatever shards exist.
    /// A counter with no shards sums to zero. Each shard's count is read
    /// at its own instant, so increments running concurrently with the
    /// read may or may not be included. Once no increments are in flight,
    /// the returned value is exact.
    pub async fn total(&self) -> Result<i64> {
        let records = self.store.list_shards(&self.name).await?;
        let total = records.iter().map(|record| record.count).sum();
        trace!(counter = %self.name, total, "aggregated shard counts");
        Ok(total)
    }

    /// Returns the number of shard records that actually exist for this
    /// counter, which can differ from the configured count after a failed
    /// or mismatched initialization.
    pub async fn shards(&self) -> Result<u32> {
        Ok(self.store.list_shards(&self.name).await?.len() as u32)
    }

    /// Reads every shard record of this counter, sorted by shard index.
    ///
    /// The same per-record consistency caveat as [`total`](Self::total)
    /// applies.
    pub async fn read_shards(&self) -> Result<Vec<ShardRecord>> {
        let mut records = self.store.list_shards(&self.name).await?;
        records.sort_by_key(|record| record.index);
        Ok(records)
    }
}

impl<S> Clone for ShardedCounter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name.clone(),
            picker: Arc::clone(&self.picker),
        }
    }
}

impl<S> std::fmt::Debug for ShardedCounter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedCounter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::StoreResult;
    use async_trait::async_trait;

    fn shards(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    /// Wraps a `MemoryStore` and injects failures on configured paths.
    struct FlakyStore {
        inner: MemoryStore,
        fail_put_from: Option<u32>,
        fail_list: bool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_put_from: None,
                fail_list: false,
            }
        }
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn put(&self, key: &ShardKey, value: i64) -> StoreResult<()> {
            if let Some(from) = self.fail_put_from {
                if key.index() >= from {
                    return Err(StoreError::Backend(format!("write to {key} rejected")));
                }
            }
            self.inner.put(key, value).await
        }

        async fn increment(&self, key: &ShardKey, delta: i64) -> StoreResult<()> {
            self.inner.increment(key, delta).await
        }

        async fn get(&self, key: &ShardKey) -> StoreResult<i64> {
            self.inner.get(key).await
        }

        async fn list_shards(&self, counter: &str) -> StoreResult<Vec<ShardRecord>> {
            if self.fail_list {
                return Err(StoreError::Backend(
                    "UNAVAILABLE: listing failed".to_string(),
                ));
            }
            self.inner.list_shards(counter).await
        }
    }

    #[test]
    fn test_new_rejects_empty_name() {
        let result = ShardedCounter::new(Arc::new(MemoryStore::new()), "");
        assert!(matches!(result, Err(CounterError::EmptyName)));
    }

    #[tokio::test]
    async fn test_initialize_creates_zeroed_shards() {
        let store = Arc::new(MemoryStore::new());
        let counter = ShardedCounter::new(Arc::clone(&store), "c1").unwrap();
        counter.initialize(shards(8)).await.unwrap();

        assert_eq!(counter.shards().await.unwrap(), 8);
        assert_eq!(counter.total().await.unwrap(), 0);
        for index in 0..8 {
            assert_eq!(store.get(&ShardKey::new("c1", index)).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_initialize_resets_after_increments() {
        let counter = ShardedCounter::new(Arc::new(MemoryStore::new()), "c1").unwrap();
        counter.initialize(shards(4)).await.unwrap();
        for _ in 0..10 {
            counter.increment(shards(4)).await.unwrap();
        }
        assert_eq!(counter.total().await.unwrap(), 10);

        counter.initialize(shards(4)).await.unwrap();
        assert_eq!(counter.total().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reinitialize_smaller_leaves_outer_shards() {
        let store = Arc::new(MemoryStore::new());
        let counter = ShardedCounter::new(Arc::clone(&store), "c1").unwrap();
        counter.initialize(shards(8)).await.unwrap();
        store
            .increment(&ShardKey::new("c1", 6), 5)
            .await
            .unwrap();

        counter.initialize(shards(4)).await.unwrap();

        // Shards 0..4 were reset, shard 6 was outside the new range.
        assert_eq!(counter.shards().await.unwrap(), 8);
        assert_eq!(counter.total().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let counter = ShardedCounter::new(Arc::new(MemoryStore::new()), "c1").unwrap();
        counter.initialize(shards(10)).await.unwrap();
        assert_eq!(counter.total().await.unwrap(), 0);

        counter.increment(shards(10)).await.unwrap();
        assert_eq!(counter.total().await.unwrap(), 1);

        for _ in 0..99 {
            counter.increment(shards(10)).await.unwrap();
        }
        assert_eq!(counter.total().await.unwrap(), 100);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_increments_lose_nothing() {
        let counter = ShardedCounter::new(Arc::new(MemoryStore::new()), "c1").unwrap();
        counter.initialize(shards(16)).await.unwrap();
        for _ in 0..3 {
            counter.increment(shards(16)).await.unwrap();
        }

        let mut handles = vec![];
        for _ in 0..8 {
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    counter.increment(shards(16)).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(counter.total().await.unwrap(), 203);
    }

    #[tokio::test]
    async fn test_increment_uninitialized_counter_fails() {
        let counter = ShardedCounter::new(Arc::new(MemoryStore::new()), "ghost").unwrap();
        let err = counter.increment(shards(5)).await.unwrap_err();
        match err {
            CounterError::ShardNotFound { counter, index } => {
                assert_eq!(counter, "ghost");
                assert!(index < 5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_stale_shard_count_fails_without_corruption() {
        let counter = ShardedCounter::new(Arc::new(MemoryStore::new()), "c1").unwrap();
        counter.initialize(shards(1)).await.unwrap();

        // Callers are trusted to pass the right shard count; an oversized
        // one fails whenever the draw lands on a missing shard.
        let mut successes = 0i64;
        let mut failures = 0;
        for _ in 0..64 {
            match counter.increment(shards(2)).await {
                Ok(()) => successes += 1,
                Err(CounterError::ShardNotFound { index, .. }) => {
                    assert_eq!(index, 1);
                    failures += 1;
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert!(failures > 0);
        assert_eq!(counter.total().await.unwrap(), successes);
        assert_eq!(counter.shards().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_total_of_empty_counter_is_zero() {
        let counter = ShardedCounter::new(Arc::new(MemoryStore::new()), "empty").unwrap();
        assert_eq!(counter.total().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_total_propagates_backend_error_verbatim() {
        let mut store = FlakyStore::new();
        store.fail_list = true;
        let counter = ShardedCounter::new(Arc::new(store), "c1").unwrap();

        let err = counter.total().await.unwrap_err();
        assert_eq!(err.to_string(), "UNAVAILABLE: listing failed");
    }

    #[tokio::test]
    async fn test_initialize_partial_failure_keeps_written_subset() {
        let mut store = FlakyStore::new();
        store.fail_put_from = Some(3);
        let counter = ShardedCounter::new(Arc::new(store), "c1").unwrap();

        let err = counter.initialize(shards(6)).await.unwrap_err();
        assert!(err.to_string().contains("rejected"));

        // Writes below the failure threshold persisted; nothing was rolled
        // back.
        assert_eq!(counter.shards().await.unwrap(), 3);
        assert_eq!(counter.total().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_seeded_picker_applies_exactly_one_increment() {
        let counter = ShardedCounter::new(Arc::new(MemoryStore::new()), "c1")
            .unwrap()
            .with_picker(Arc::new(ShardPicker::with_seed(5)));
        counter.initialize(shards(4)).await.unwrap();
        counter.increment(shards(4)).await.unwrap();

        let records = counter.read_shards().await.unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records.iter().filter(|record| record.count == 1).count(), 1);
        assert_eq!(records.iter().map(|record| record.count).sum::<i64>(), 1);
    }

    #[tokio::test]
    async fn test_read_shards_is_sorted_by_index() {
        let counter = ShardedCounter::new(Arc::new(MemoryStore::new()), "c1").unwrap();
        counter.initialize(shards(6)).await.unwrap();

        let records = counter.read_shards().await.unwrap();
        let indices: Vec<u32> = records.iter().map(|record| record.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_debug_names_the_counter() {
        let counter = ShardedCounter::new(Arc::new(MemoryStore::new()), "visits").unwrap();
        let debug = format!("{counter:?}");
        assert!(debug.contains("visits"));
    }
}
