//! # Async Resource
//!
//! This crate provides the state engine behind data-driven UIs: you register a
//! **producer** (an async function that fetches some data) under an identifier,
//! views **subscribe** to that identifier, and **consume** it when they need
//! the data. The store tracks every step of the lifecycle and tells each
//! subscriber about it.
//!
//! ## What the Store Does For You
//!
//! - **Status tracking**: every resource is a [`Resource`] snapshot with
//!   `loading`, `loaded`, `updating`, `error` and `cache` flags.
//! - **Deduplication**: concurrent `consume` calls share a single producer
//!   invocation; an already loaded resource is not fetched again unless asked.
//! - **Caching**: producers can persist their results to a pluggable
//!   [`Storage`](storage::Storage) and be served from it on the next start,
//!   subject to a TTL.
//! - **Refreshing**: producers with a TTL are polled for as long as someone
//!   holds a [`ConsumeHandle`].
//! - **Families**: [`NamespaceStore`] manages an open-ended set of resources
//!   sharing one producer (one per user, per entity, ...).
//!
//! ## Architecture Overview
//!
//! 1. **Producer Layer** ([`Source`], [`NamespacedSource`]) - your fetch/update logic
//! 2. **Engine Layer** ([`ResourceStore`], [`NamespaceStore`]) - lifecycle, dedup, cache, TTL
//! 3. **Collaborators** ([`storage`], [`scheduler`]) - persistence and timers, both swappable
//!
//! ## Quick Example
//!
//! ```rust
//! use async_resource::{source_fn, BoxError, ConsumeOptions, Producer, ResourceStore, SourceRequest};
//! use std::sync::{Arc, Mutex};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store: ResourceStore<String> = ResourceStore::new();
//!     store
//!         .register(
//!             "user",
//!             Producer::new(source_fn(|_req: SourceRequest<String, _>| async move {
//!                 Ok::<_, BoxError>("Bob".to_string())
//!             })),
//!         )
//!         .await;
//!
//!     let seen = Arc::new(Mutex::new(Vec::new()));
//!     let sink = Arc::clone(&seen);
//!     let subscription = store.subscribe("user", move |resource| {
//!         sink.lock().unwrap().push(resource.clone());
//!     });
//!
//!     let handle = store.consume("user", ConsumeOptions::new()).await.unwrap();
//!
//!     let seen = seen.lock().unwrap();
//!     assert_eq!(seen.len(), 3); // default, loading, loaded
//!     assert!(seen[1].loading);
//!     assert_eq!(seen[2].data.as_deref(), Some("Bob"));
//!
//!     handle.stop();
//!     subscription.unsubscribe();
//! }
//! ```
//!
//! ## Error Handling
//!
//! - Unknown identifiers fail synchronously with [`StoreError::NotRegistered`].
//! - A failing fetch never fails `consume`: it shows up as an `error` snapshot.
//! - A failing update rolls the snapshot back **and** is returned to the
//!   caller as [`StoreError::Update`].
//! - Storage errors are logged and degrade to cache misses.
//!
//! ## Testing
//!
//! The [`mock`] module provides a scriptable [`MockStorage`](mock::MockStorage)
//! and a [`Recorder`](mock::Recorder) subscriber. TTL behaviour is tested with
//! Tokio's paused clock (`#[tokio::test(start_paused = true)]`).

pub mod config;
pub mod error;
pub mod mock;
pub mod model;
pub mod namespace;
pub mod scheduler;
pub mod source;
pub mod storage;
pub mod store;
pub mod tracing;

// Re-export core types for convenience
pub use config::StoreConfig;
pub use error::{BoxError, StorageError, StoreError};
pub use model::{NamespaceResources, Resource, ResourceData, ResourceProps, Summary};
pub use namespace::{NamespaceConsumer, NamespaceStore};
pub use source::{
    namespaced_source_fn, source_fn, CacheOptions, FnSource, NamespacedFnSource, NamespacedProducer,
    NamespacedRequest, NamespacedSource, Producer, Source, SourceOptions, SourceRequest,
};
pub use store::{CacheStatus, ConsumeHandle, ConsumeOptions, Consumer, ResourceStore, Subscription};
