//! Unified error type for counter operations.

use thiserror::Error;

use crate::store::StoreError;

/// Error type returned by every counter operation.
///
/// Store failures pass through with their original message; the remaining
/// variants are produced by the counter layer itself before or after the
/// store round-trip.
#[derive(Debug, Error)]
pub enum CounterError {
    /// The counter name was empty. Detected before any store interaction.
    #[error("counter name must not be empty")]
    EmptyName,

    /// An increment targeted a shard record that does not exist, usually
    /// because the shard count passed to `increment` exceeds the number of
    /// shards the counter was initialized with.
    #[error("shard {index} of counter \"{counter}\" does not exist")]
    ShardNotFound {
        /// Name of the counter the increment was aimed at.
        counter: String,
        /// The shard index that had no backing record.
        index: u32,
    },

    /// A store-level failure, surfaced verbatim.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for counter operations.
pub type Result<T> = std::result::Result<T, CounterError>;
