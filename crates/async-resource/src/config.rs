//! Store-wide settings.

use crate::storage::{MemoryStorage, Storage};
use std::fmt;
use std::sync::Arc;

/// Appended to an identifier to form its cache key (`"user"` -> `"userResource"`).
pub const DEFAULT_KEY_SUFFIX: &str = "Resource";

/// Joins a parent identifier and a namespace (`"accounts/bob@mail.com"`).
pub const DEFAULT_NAMESPACE_SEPARATOR: &str = "/";

/// Settings shared by every resource of a store.
#[derive(Clone)]
pub struct StoreConfig {
    /// Storage used by cache-backed producers that don't bring their own.
    pub storage: Arc<dyn Storage>,
    pub key_suffix: String,
    pub namespace_separator: String,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn key_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.key_suffix = suffix.into();
        self
    }

    pub fn namespace_separator(mut self, separator: impl Into<String>) -> Self {
        self.namespace_separator = separator.into();
        self
    }

    /// Storage slot of a resource. Registration, consumption and clearing all
    /// go through this, so they always agree on the key.
    pub fn cache_key(&self, id: &str) -> String {
        format!("{id}{}", self.key_suffix)
    }

    /// Identifier of the concrete resource backing one namespace.
    pub fn namespace_id(&self, id: &str, namespace: &str) -> String {
        format!("{id}{}{namespace}", self.namespace_separator)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            key_suffix: DEFAULT_KEY_SUFFIX.to_string(),
            namespace_separator: DEFAULT_NAMESPACE_SEPARATOR.to_string(),
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("key_suffix", &self.key_suffix)
            .field("namespace_separator", &self.namespace_separator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_keys() {
        let config = StoreConfig::default();
        assert_eq!(config.cache_key("user"), "userResource");
        assert_eq!(config.namespace_id("accounts", "bob@mail.com"), "accounts/bob@mail.com");

        let custom = StoreConfig::new().key_suffix(":v2").namespace_separator("::");
        assert_eq!(custom.cache_key("user"), "user:v2");
        assert_eq!(custom.namespace_id("a", "b"), "a::b");
    }
}
