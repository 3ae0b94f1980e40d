//! The keyed-record store boundary.
//!
//! Counters in this crate never talk to a concrete database directly. They
//! are written against the [`Store`] trait, the minimum capability set the
//! sharded counter pattern needs from a persistence backend:
//!
//! | Operation | Contract |
//! |-----------|----------|
//! | [`put`](Store::put) | Upsert a record; no partial write is observable |
//! | [`increment`](Store::increment) | Server-side atomic add; fails if the key is absent |
//! | [`get`](Store::get) | Point read of a single record |
//! | [`list_shards`](Store::list_shards) | All records under a counter, order unspecified |
//!
//! Anything offering these four operations can host a sharded counter: a
//! document database, a wide-column store, a Redis hash per counter. The
//! crate ships [`memory::MemoryStore`] for tests and local runs.
//!
//! # Consistency
//!
//! The trait deliberately promises very little. `increment` must be atomic
//! and commutative under concurrent callers on the same key, and
//! `list_shards` must return a point-in-time value for each record it
//! yields, but there is no snapshot isolation across records and no
//! ordering between operations on different keys. The counter layer is
//! built to tolerate exactly that contract.

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Key of a single shard record: the owning counter's name plus the shard
/// index within it.
///
/// The rendered form is `{counter}/shards/{index}`, which is also how keys
/// appear in error messages.
///
/// # Examples
///
/// ```rust
/// use frantumi::store::ShardKey;
///
/// let key = ShardKey::new("page_visits", 3);
/// assert_eq!(key.counter(), "page_visits");
/// assert_eq!(key.index(), 3);
/// assert_eq!(key.to_string(), "page_visits/shards/3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShardKey {
    counter: String,
    index: u32,
}

impl ShardKey {
    /// Creates a key for shard `index` of the named counter.
    pub fn new(counter: impl Into<String>, index: u32) -> Self {
        Self {
            counter: counter.into(),
            index,
        }
    }

    /// Name of the counter this shard belongs to.
    pub fn counter(&self) -> &str {
        &self.counter
    }

    /// Index of this shard within the counter's shard set.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/shards/{}", self.counter, self.index)
    }
}

/// One record as returned by [`Store::list_shards`].
///
/// The count is the record's value at the instant that record was read;
/// different records in the same listing may have been read at different
/// instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShardRecord {
    /// Shard index within the counter.
    pub index: u32,
    /// Stored count of this shard.
    pub count: i64,
}

/// Errors produced by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists at the given key.
    #[error("no record at {key}")]
    NotFound {
        /// The key that had no backing record.
        key: ShardKey,
    },

    /// Any other backend failure. The message is whatever the backend
    /// reported and is propagated unchanged.
    #[error("{0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Minimum store capability set required to host sharded counters.
///
/// Implementations must be safe to share across concurrent callers; every
/// method may be invoked from any number of tasks at once.
#[async_trait]
pub trait Store: Send + Sync {
    /// Upserts the record at `key` to `value`.
    ///
    /// An existing record is overwritten. Readers that do not race the
    /// write observe either the old value or the new one, never a partial
    /// state.
    async fn put(&self, key: &ShardKey, value: i64) -> StoreResult<()>;

    /// Atomically adds `delta` to the record at `key`.
    ///
    /// The addition happens backend-side, so concurrent increments to the
    /// same key all take effect regardless of interleaving. Fails with
    /// [`StoreError::NotFound`] if no record exists at `key`.
    async fn increment(&self, key: &ShardKey, delta: i64) -> StoreResult<()>;

    /// Reads the record at `key`.
    ///
    /// Fails with [`StoreError::NotFound`] if no record exists.
    async fn get(&self, key: &ShardKey) -> StoreResult<i64>;

    /// Returns every shard record stored under `counter`.
    ///
    /// Each returned record is a point-in-time read of that record; the
    /// listing as a whole is not a consistent snapshot, and the order of
    /// the returned records is unspecified. A counter with no shards
    /// yields an empty vector.
    async fn list_shards(&self, counter: &str) -> StoreResult<Vec<ShardRecord>>;
}
