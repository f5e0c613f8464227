//! # System Lifecycle
//!
//! This module wires the stores, the producers and the clients into one
//! [`ResourceSystem`], and tears them down again.
//!
//! ## Start-up
//!
//! 1. **Store creation** - one [`ResourceStore`](async_resource::ResourceStore) per payload type, sharing the configured storage
//! 2. **Registration** - the profile producer (cache-backed, read before start-up returns) and the accounts family
//! 3. **Client creation** - typed clients over the stores
//!
//! ```rust,ignore
//! let system = ResourceSystem::new(Arc::new(Directory::seeded())).await;
//! let handle = system.profile_client.load().await?;
//! ```
//!
//! The profile cache read happens during [`ResourceSystem::with_config`], so
//! a persisted profile is visible as soon as the system is returned.
//!
//! ## Shutdown
//!
//! [`ResourceSystem::shutdown`] detaches every namespace subscriber and drops
//! the stores, which cancels pending refreshes. Persisted cache entries are
//! kept for the next start. [`ResourceSystem::sign_out`] is the opposite: it
//! purges everything, persisted entries included, and registers the producers
//! again.
//!
//! ## Observability
//!
//! [`setup_tracing`] installs the log subscriber once per process:
//!
//! ```bash
//! RUST_LOG=info cargo run -p async-resource-sample
//! RUST_LOG=async_resource=debug,info cargo run -p async-resource-sample
//! ```

pub mod resource_system;

pub use async_resource::tracing::setup_tracing;
pub use resource_system::*;
