//! # Resource Snapshots
//!
//! A [`Resource`] is the immutable state of one identifier at one point in
//! time. The stores never mutate a snapshot in place; every transition builds a
//! new value and hands it to subscribers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

/// Bounds required of resource payloads.
///
/// Payloads are cloned into every snapshot and serialized into the cache.
pub trait ResourceData: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> ResourceData for T where T: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Bounds required of the caller-supplied props forwarded to producers.
pub trait ResourceProps: Clone + Debug + Send + Sync + 'static {}

impl<P> ResourceProps for P where P: Clone + Debug + Send + Sync + 'static {}

/// The tracked state of one resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource<T> {
    /// The data was read from the cache rather than fetched.
    pub cache: bool,
    /// A fetch is in flight.
    pub loading: bool,
    /// An update is in flight.
    pub updating: bool,
    pub loaded: bool,
    pub error: Option<String>,
    pub data: Option<T>,
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self {
            cache: false,
            loading: false,
            updating: false,
            loaded: false,
            error: None,
            data: None,
        }
    }
}

impl<T> Resource<T> {
    /// Freshly fetched data.
    pub fn loaded(data: T) -> Self {
        Self {
            loaded: true,
            data: Some(data),
            ..Self::default()
        }
    }

    /// Data served from the cache.
    pub fn cached(data: T) -> Self {
        Self {
            cache: true,
            ..Self::loaded(data)
        }
    }

    /// A failed fetch: no data, not loaded.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

impl<T: Clone> Resource<T> {
    pub fn with_loading(&self, loading: bool) -> Self {
        Self {
            loading,
            ..self.clone()
        }
    }

    pub fn with_updating(&self, updating: bool) -> Self {
        Self {
            updating,
            ..self.clone()
        }
    }
}

/// Current snapshots of every materialized namespace under one parent id,
/// in the order the namespaces were first consumed.
#[derive(Clone, Debug, PartialEq)]
pub struct NamespaceResources<T> {
    entries: Vec<(String, Resource<T>)>,
    // position of each namespace in `entries`
    index: HashMap<String, usize>,
}

impl<T> Default for NamespaceResources<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> NamespaceResources<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts or replaces the snapshot for `namespace`, keeping its position.
    pub fn insert(&mut self, namespace: impl Into<String>, resource: Resource<T>) {
        let namespace = namespace.into();
        match self.index.get(&namespace).copied() {
            Some(position) => self.entries[position].1 = resource,
            None => {
                self.index.insert(namespace.clone(), self.entries.len());
                self.entries.push((namespace, resource));
            }
        }
    }

    pub fn get(&self, namespace: &str) -> Option<&Resource<T>> {
        let position = *self.index.get(namespace)?;
        self.entries.get(position).map(|(_, resource)| resource)
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.index.contains_key(namespace)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resource<T>)> {
        self.entries.iter().map(|(name, resource)| (name.as_str(), resource))
    }

    /// Accumulated flags over every namespace.
    pub fn summary(&self) -> Summary {
        Summary::of(self.entries.iter().map(|(_, resource)| resource))
    }
}

impl<T> FromIterator<(String, Resource<T>)> for NamespaceResources<T> {
    fn from_iter<I: IntoIterator<Item = (String, Resource<T>)>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut resources = Self::with_capacity(iter.size_hint().0);
        for (namespace, resource) in iter {
            resources.insert(namespace, resource);
        }
        resources
    }
}

/// Accumulated status of a group of resources, as shown by views that render
/// several resources at once.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Summary {
    /// Every resource is loaded.
    pub loaded: bool,
    /// The first error found, in iteration order.
    pub error: Option<String>,
    /// Something is still pending: either a fetch is in flight, or not
    /// everything is loaded and nothing has failed yet.
    pub loading: bool,
}

impl Summary {
    pub fn of<'a, T: 'a>(resources: impl IntoIterator<Item = &'a Resource<T>>) -> Self {
        let mut loaded = true;
        let mut any_loading = false;
        let mut error = None;
        for resource in resources {
            loaded &= resource.loaded;
            any_loading |= resource.loading;
            if error.is_none() {
                error.clone_from(&resource.error);
            }
        }
        let loading = (!loaded && error.is_none()) || any_loading;
        Self {
            loaded,
            error,
            loading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_all_false() {
        let resource = Resource::<String>::default();
        assert!(!resource.cache && !resource.loading && !resource.updating && !resource.loaded);
        assert_eq!(resource.error, None);
        assert_eq!(resource.data, None);
    }

    #[test]
    fn namespace_resources_keep_first_insert_order() {
        let mut resources = NamespaceResources::new();
        resources.insert("b", Resource::<u32>::default());
        resources.insert("a", Resource::default());
        resources.insert("b", Resource::loaded(2));

        let names: Vec<_> = resources.namespaces().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(resources.get("b"), Some(&Resource::loaded(2)));
    }

    #[test]
    fn large_families_collect_in_order_without_duplicates() {
        let names: Vec<String> = (0..5_000).map(|n| format!("ns-{n}")).collect();
        let resources: NamespaceResources<usize> = names
            .iter()
            .enumerate()
            .map(|(n, name)| (name.clone(), Resource::loaded(n)))
            .chain(std::iter::once(("ns-0".to_string(), Resource::loaded(42))))
            .collect();

        assert_eq!(resources.len(), 5_000);
        assert!(resources.namespaces().eq(names.iter().map(String::as_str)));
        assert_eq!(resources.get("ns-0"), Some(&Resource::loaded(42)));
        assert_eq!(resources.get("ns-4999"), Some(&Resource::loaded(4_999)));
        assert!(resources.contains("ns-2500"));
        assert!(!resources.contains("ns-5000"));
    }

    #[test]
    fn summary_is_loaded_only_when_everything_is() {
        let resources: NamespaceResources<u32> = vec![
            ("a".to_string(), Resource::loaded(1)),
            ("b".to_string(), Resource::default().with_loading(true)),
        ]
        .into_iter()
        .collect();

        let summary = resources.summary();
        assert!(!summary.loaded);
        assert!(summary.loading);
        assert_eq!(summary.error, None);

        let both: NamespaceResources<u32> = vec![
            ("a".to_string(), Resource::loaded(1)),
            ("b".to_string(), Resource::loaded(2)),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            both.summary(),
            Summary {
                loaded: true,
                error: None,
                loading: false
            }
        );
    }

    #[test]
    fn summary_reports_first_error() {
        let resources = [
            Resource::<u32>::loaded(1),
            Resource::failed("first"),
            Resource::failed("second"),
        ];
        let summary = Summary::of(&resources);
        assert!(!summary.loaded);
        assert!(!summary.loading);
        assert_eq!(summary.error.as_deref(), Some("first"));
    }

    #[test]
    fn empty_group_counts_as_loaded() {
        let summary = Summary::of(std::iter::empty::<&Resource<u32>>());
        assert!(summary.loaded);
        assert!(!summary.loading);
    }
}
