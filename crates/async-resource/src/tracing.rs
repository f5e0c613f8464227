//! # Observability
//!
//! The stores log every lifecycle step through `tracing` with a
//! `resource_id` field (plus `namespace`, `cache_key` and `error` where they
//! apply):
//!
//! | Level | Events |
//! |-------|--------|
//! | `info` | Registrations, completed fetches and updates, cache hits, clears |
//! | `debug` | Consume/update requests, short-circuits, subscriptions, TTL ticks |
//! | `warn` | Producer failures, storage degradation, unknown identifiers |
//! | `trace` | Scheduler bookkeeping |
//!
//! ## Usage Examples
//!
//! ```bash
//! # Lifecycle only
//! RUST_LOG=info cargo run -p async-resource-sample
//!
//! # Every transition request
//! RUST_LOG=async_resource=debug cargo run -p async-resource-sample
//! ```
//!
//! **With `RUST_LOG=debug`**:
//!
//! ```text
//! INFO Registered resource_id=user cached=true ttl=None
//! DEBUG Cache miss resource_id=user cache_key=userResource expired=false
//! DEBUG Consume resource_id=user options=ConsumeOptions { props: None, reload: false } trigger=Caller
//! INFO Loaded resource_id=user
//! DEBUG Cached resource_id=user cache_key=userResource
//! ```

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Call once, at application start-up.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
