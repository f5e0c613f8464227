//! # Store Errors
//!
//! This module defines the error types surfaced by the resource stores and the
//! storage backends. Producer failures are *not* represented here as a variant
//! of their own: a failed fetch is folded into the resource snapshot (its
//! `error` field), so callers only ever see it through a subscription.

/// Error type returned by producers (`fetch` / `update`).
///
/// Its `Display` output becomes the `error` message of the failed snapshot.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur when calling into a store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Resource not registered: {0}")]
    NotRegistered(String),
    #[error("Namespaced resource not registered: {0}")]
    NamespaceNotRegistered(String),
    #[error("Update not registered for resource: {0}")]
    UpdateNotSupported(String),
    /// The producer's `update` failed. The snapshot has already been rolled
    /// back to its pre-update value when this is returned.
    #[error("Update failed for resource {id}: {source}")]
    Update {
        id: String,
        #[source]
        source: BoxError,
    },
}

/// Errors raised by a [`Storage`](crate::storage::Storage) backend.
///
/// The stores never propagate these: reads degrade to a cache miss and
/// writes are skipped, both with a `warn!`.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
