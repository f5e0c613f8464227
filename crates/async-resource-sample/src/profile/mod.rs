//! # Profile Resource
//!
//! The signed-in user's profile, registered under [`PROFILE_ID`].
//!
//! ## Structure
//!
//! - [`source`] - [`ProfileSource`], the producer reading and saving the profile through the [`Directory`](crate::directory::Directory)
//! - [`error`] - [`ProfileError`] returned by the [`ProfileClient`](crate::clients::ProfileClient)
//! - [`producer()`] - Factory bundling the source with its cache settings
//!
//! ## Caching
//!
//! The profile is cache-backed: every successful fetch is persisted under
//! `userResource`, and a fresh record is served on registration without
//! contacting the directory. Updates are not persisted until the next fetch.

pub mod error;
pub mod source;

pub use error::*;
pub use source::*;

use crate::directory::Directory;
use crate::model::{ProfilePatch, UserProfile};
use async_resource::{CacheOptions, Producer};
use std::sync::Arc;
use std::time::Duration;

/// Identifier of the profile resource.
pub const PROFILE_ID: &str = "user";

/// Creates the profile producer. Cache records older than `cache_ttl` are ignored.
pub fn producer(directory: Arc<Directory>, cache_ttl: Duration) -> Producer<UserProfile, ProfilePatch> {
    Producer::new(ProfileSource::new(directory)).cache(CacheOptions::new().ttl(cache_ttl))
}
