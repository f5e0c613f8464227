//! # Accounts Resource
//!
//! Directory accounts, registered as the namespaced resource [`ACCOUNTS_ID`]
//! with one namespace per e-mail address. An account is fetched the first
//! time its address is looked up and kept for the lifetime of the system.
//!
//! ## Usage
//!
//! ```rust
//! use async_resource::{ConsumeOptions, NamespaceStore};
//! use async_resource_sample::accounts::{self, ACCOUNTS_ID};
//! use async_resource_sample::directory::Directory;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = NamespaceStore::new();
//!     store.register(ACCOUNTS_ID, accounts::producer(Arc::new(Directory::seeded())));
//!
//!     let handle = store.consume(ACCOUNTS_ID, "bob@mail.com", ConsumeOptions::new()).await?;
//!     assert!(store.resources(ACCOUNTS_ID).summary().loaded);
//!     handle.stop();
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod source;

pub use error::*;
pub use source::*;

use crate::directory::Directory;
use crate::model::Account;
use async_resource::NamespacedProducer;
use std::sync::Arc;

/// Identifier of the accounts family.
pub const ACCOUNTS_ID: &str = "accounts";

/// Creates the accounts producer.
pub fn producer(directory: Arc<Directory>) -> NamespacedProducer<Account, ()> {
    NamespacedProducer::new(AccountsSource::new(directory))
}
