//! # Namespaced Resources
//!
//! A namespaced resource is a family of resources sharing one producer, keyed
//! by a secondary string: `accounts` + `bob@mail.com`, `events` + `party`.
//! Members are created lazily the first time they are consumed and live until
//! the whole family is cleared.
//!
//! Each member is an ordinary resource of the underlying [`ResourceStore`],
//! registered under a composite identifier (`accounts/bob@mail.com`). The
//! namespace store listens to every member and, on any change, rebuilds the
//! full [`NamespaceResources`] map and hands it to the family's subscribers.
//! Rebuilding is linear in the number of members; families are expected to be
//! small.

use crate::error::{BoxError, StoreError};
use crate::model::{NamespaceResources, ResourceData, ResourceProps};
use crate::source::{
    NamespacedProducer, NamespacedRequest, NamespacedSource, Producer, Source, SourceRequest,
};
use crate::store::{ConsumeHandle, ConsumeOptions, ResourceStore, Subscription};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::{debug, info, warn};

/// A subscriber to a whole family. Identity is the `Arc` allocation.
pub type NamespaceConsumer<T> = Arc<dyn Fn(&NamespaceResources<T>) + Send + Sync>;

struct NamespaceState<T: ResourceData, P: ResourceProps> {
    // parent id -> namespaces in first-consumed order
    namespaces: HashMap<String, Vec<String>>,
    producers: HashMap<String, NamespacedProducer<T, P>>,
    consumers: HashMap<String, Vec<NamespaceConsumer<T>>>,
    subscriptions: HashMap<String, Vec<Subscription>>,
}

impl<T: ResourceData, P: ResourceProps> Default for NamespaceState<T, P> {
    fn default() -> Self {
        Self {
            namespaces: HashMap::new(),
            producers: HashMap::new(),
            consumers: HashMap::new(),
            subscriptions: HashMap::new(),
        }
    }
}

struct NamespaceInner<T: ResourceData, P: ResourceProps> {
    store: ResourceStore<T, P>,
    state: Mutex<NamespaceState<T, P>>,
}

impl<T: ResourceData, P: ResourceProps> NamespaceInner<T, P> {
    fn lock(&self) -> MutexGuard<'_, NamespaceState<T, P>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Manages families of resources on top of a [`ResourceStore`].
pub struct NamespaceStore<T: ResourceData, P: ResourceProps = serde_json::Value> {
    inner: Arc<NamespaceInner<T, P>>,
}

impl<T: ResourceData, P: ResourceProps> Clone for NamespaceStore<T, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ResourceData, P: ResourceProps> Default for NamespaceStore<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ResourceData, P: ResourceProps> fmt::Debug for NamespaceStore<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("NamespaceStore")
            .field("families", &state.namespaces.len())
            .finish_non_exhaustive()
    }
}

impl<T: ResourceData, P: ResourceProps> NamespaceStore<T, P> {
    /// A namespace store over a fresh [`ResourceStore`].
    pub fn new() -> Self {
        Self::with_store(ResourceStore::new())
    }

    /// A namespace store whose members live in `store`.
    pub fn with_store(store: ResourceStore<T, P>) -> Self {
        Self {
            inner: Arc::new(NamespaceInner {
                store,
                state: Mutex::new(NamespaceState::default()),
            }),
        }
    }

    /// The store holding the members.
    pub fn store(&self) -> &ResourceStore<T, P> {
        &self.inner.store
    }

    /// Registers the producer of the family `id`. No member is created yet.
    pub fn register(&self, id: impl Into<String>, producer: NamespacedProducer<T, P>) {
        let id = id.into();
        let mut state = self.inner.lock();
        state.namespaces.insert(id.clone(), Vec::new());
        state.producers.insert(id.clone(), producer);
        info!(resource_id = %id, "Registered namespaced resource");
    }

    /// Consumes the member `namespace` of family `id`, creating it on first use.
    pub async fn consume(
        &self,
        id: &str,
        namespace: &str,
        options: ConsumeOptions<P>,
    ) -> Result<ConsumeHandle, StoreError> {
        let created = {
            let mut state = self.inner.lock();
            let Some(producer) = state.producers.get(id).cloned() else {
                warn!(resource_id = %id, "Namespaced resource not registered");
                return Err(StoreError::NamespaceNotRegistered(id.to_string()));
            };
            let Some(known) = state.namespaces.get_mut(id) else {
                return Err(StoreError::NamespaceNotRegistered(id.to_string()));
            };
            if known.iter().any(|n| n == namespace) {
                None
            } else {
                known.push(namespace.to_string());
                Some(producer)
            }
        };

        let member_id = self.inner.store.config().namespace_id(id, namespace);
        if let Some(producer) = created {
            debug!(resource_id = %id, namespace, "Creating namespace");
            let bridge = NamespaceBridge {
                source: Arc::clone(&producer.source),
                parent: id.to_string(),
                namespace: namespace.to_string(),
                registry: Arc::downgrade(&self.inner),
            };
            let mut member = Producer::new(bridge);
            member.options = producer.options.clone();
            self.inner.store.register(member_id.clone(), member).await;

            let weak = Arc::downgrade(&self.inner);
            let parent = id.to_string();
            let subscription = self.inner.store.subscribe(member_id.clone(), move |_| {
                if let Some(inner) = weak.upgrade() {
                    NamespaceStore { inner }.broadcast(&parent);
                }
            });
            self.inner
                .lock()
                .subscriptions
                .entry(id.to_string())
                .or_default()
                .push(subscription);
        }

        self.inner.store.consume(&member_id, options).await
    }

    /// Subscribes to every member of family `id`.
    ///
    /// The callback is invoked right away with the current map if at least
    /// one member exists.
    pub fn subscribe<F>(&self, id: &str, callback: F) -> Result<Subscription, StoreError>
    where
        F: Fn(&NamespaceResources<T>) + Send + Sync + 'static,
    {
        self.subscribe_consumer(id, Arc::new(callback))
    }

    pub fn subscribe_consumer(
        &self,
        id: &str,
        consumer: NamespaceConsumer<T>,
    ) -> Result<Subscription, StoreError> {
        let has_members = {
            let mut state = self.inner.lock();
            let Some(known) = state.namespaces.get(id) else {
                warn!(resource_id = %id, "Namespaced resource not registered");
                return Err(StoreError::NamespaceNotRegistered(id.to_string()));
            };
            let has_members = !known.is_empty();
            state
                .consumers
                .entry(id.to_string())
                .or_default()
                .push(Arc::clone(&consumer));
            has_members
        };
        if has_members {
            consumer(&self.resources(id));
        }

        let weak = Arc::downgrade(&self.inner);
        let id = id.to_string();
        Ok(Subscription::new(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Self::remove_consumer(&inner, &id, &consumer);
            }
        })))
    }

    /// Removes every registration of `consumer` (by identity) under `id`.
    pub fn unsubscribe(&self, id: &str, consumer: &NamespaceConsumer<T>) {
        Self::remove_consumer(&self.inner, id, consumer);
    }

    fn remove_consumer(inner: &NamespaceInner<T, P>, id: &str, consumer: &NamespaceConsumer<T>) {
        if let Some(consumers) = inner.lock().consumers.get_mut(id) {
            consumers.retain(|c| !Arc::ptr_eq(c, consumer));
        }
    }

    /// Names of the members of family `id`, in first-consumed order, or
    /// `None` if the family is not registered.
    pub fn namespaces(&self, id: &str) -> Option<Vec<String>> {
        self.inner.lock().namespaces.get(id).cloned()
    }

    /// Current snapshot of every member of family `id`.
    pub fn resources(&self, id: &str) -> NamespaceResources<T> {
        let known = self.namespaces(id).unwrap_or_default();
        let config = self.inner.store.config();
        let mut resources = NamespaceResources::with_capacity(known.len());
        for namespace in known {
            if let Some(resource) = self.inner.store.get(&config.namespace_id(id, &namespace)) {
                resources.insert(namespace, resource);
            }
        }
        resources
    }

    /// Forgets every family, its producer and its subscribers, and detaches
    /// from the member resources. The members themselves stay in the
    /// underlying store until it is cleared.
    pub fn clear(&self) {
        let subscriptions = {
            let mut state = self.inner.lock();
            state.namespaces.clear();
            state.producers.clear();
            state.consumers.clear();
            std::mem::take(&mut state.subscriptions)
        };
        info!(families = subscriptions.len(), "Clearing namespaced resources");
        for subscription in subscriptions.into_values().flatten() {
            subscription.unsubscribe();
        }
    }

    fn broadcast(&self, id: &str) {
        let consumers = self.inner.lock().consumers.get(id).cloned().unwrap_or_default();
        if consumers.is_empty() {
            return;
        }
        let resources = self.resources(id);
        for consumer in &consumers {
            consumer(&resources);
        }
    }
}

/// Adapts a [`NamespacedSource`] to the plain [`Source`] of one member.
struct NamespaceBridge<T: ResourceData, P: ResourceProps> {
    source: Arc<dyn NamespacedSource<T, P>>,
    parent: String,
    namespace: String,
    registry: Weak<NamespaceInner<T, P>>,
}

#[async_trait]
impl<T: ResourceData, P: ResourceProps> Source<T, P> for NamespaceBridge<T, P> {
    async fn fetch(&self, request: SourceRequest<T, P>) -> Result<T, BoxError> {
        let resources = self
            .registry
            .upgrade()
            .map(|inner| NamespaceStore { inner }.resources(&self.parent))
            .unwrap_or_default();
        self.source
            .fetch(NamespacedRequest {
                props: request.props,
                resource: request.resource,
                namespace: self.namespace.clone(),
                resources,
            })
            .await
    }
}
