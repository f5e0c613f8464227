//! # Typed Clients
//!
//! Thin wrappers over the stores that fix the resource identifiers and map
//! snapshots to domain results, so callers never handle identifiers or raw
//! [`Resource`](async_resource::Resource) flags.

pub mod accounts_client;
pub mod profile_client;

pub use accounts_client::AccountsClient;
pub use profile_client::ProfileClient;
