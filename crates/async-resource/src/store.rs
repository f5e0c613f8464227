//! # Resource Store
//!
//! This module defines [`ResourceStore`], the engine that owns every resource
//! snapshot, every registered producer and every subscriber list, and drives
//! the lifecycle of each identifier:
//!
//! ```text
//! register ──► (cache read) ──► consume ──► loading ──► loaded | error
//!                                  ▲                        │
//!                                  └──── TTL refresh ◄──────┘
//! ```
//!
//! # Concurrency Model
//! All state lives behind one mutex that is never held across an `.await`.
//! Each transition is committed under the lock and then fanned out to the
//! subscribers *after* the lock is released, synchronously and in subscription
//! order. Subscribers may therefore call back into the store (`get`,
//! `subscribe`, ...) without deadlocking.
//!
//! Deduplication relies on the snapshot flags rather than a lock held for the
//! duration of a fetch: the `loading` check and the `loading: true` write
//! happen in the same critical section, so a second `consume` racing an
//! in-flight fetch returns without calling the producer. `update` is guarded
//! the same way by `updating`.
//!
//! Notification order across *different* tasks is only total on a
//! current-thread runtime, which is the intended deployment (a UI event loop).
//!
//! # Usage Counting
//! Every caller-initiated `consume` increments a per-identifier usage counter
//! and returns a [`ConsumeHandle`]; calling [`ConsumeHandle::stop`] decrements
//! it. A TTL tick that finds the counter at zero does nothing, which is the only
//! form of cancellation the store offers: an in-flight fetch always completes.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::model::{Resource, ResourceData, ResourceProps};
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::source::{CacheOptions, Producer, SourceRequest};
use crate::storage::{CacheRecord, Storage};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A subscriber callback. Identity is the `Arc` allocation.
pub type Consumer<T> = Arc<dyn Fn(&Resource<T>) + Send + Sync>;

/// Options of a `consume` call. The last options seen for an identifier are
/// remembered and replayed by TTL refreshes and deferred cache misses.
#[derive(Clone, Debug)]
pub struct ConsumeOptions<P> {
    pub props: Option<P>,
    /// Fetch even if the resource is already loaded.
    pub reload: bool,
}

impl<P> Default for ConsumeOptions<P> {
    fn default() -> Self {
        Self {
            props: None,
            reload: false,
        }
    }
}

impl<P> ConsumeOptions<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn props(mut self, props: P) -> Self {
        self.props = Some(props);
        self
    }

    pub fn reload(mut self) -> Self {
        self.reload = true;
        self
    }
}

/// Outcome of the cache read performed by [`ResourceStore::register`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    /// The producer has no cache configuration.
    Disabled,
    /// A fresh record was found and served.
    Hit,
    /// No usable record (absent, expired, unreadable).
    Miss,
}

/// Who asked for a fetch. Only callers hold a usage count; only polls bypass
/// the "already loaded" short-circuit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trigger {
    Caller,
    Poll,
    Replay,
}

type Release = Box<dyn FnOnce() + Send + Sync>;

/// Returned by `consume`: keeps the resource on its TTL refresh schedule until
/// [`stop`](Self::stop) is called.
///
/// Dropping the handle does *not* release it.
#[must_use = "call `stop` once the resource no longer needs refreshing"]
pub struct ConsumeHandle {
    release: Option<Release>,
}

impl ConsumeHandle {
    fn new(release: Release) -> Self {
        Self {
            release: Some(release),
        }
    }

    fn detached() -> Self {
        Self { release: None }
    }

    /// Releases this caller's interest in TTL refreshes.
    pub fn stop(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Whether `stop` would decrement a usage counter.
    pub fn is_counted(&self) -> bool {
        self.release.is_some()
    }
}

impl fmt::Debug for ConsumeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumeHandle")
            .field("counted", &self.is_counted())
            .finish()
    }
}

/// Returned by `subscribe`: removes the subscriber when
/// [`unsubscribe`](Self::unsubscribe) is called.
#[must_use = "dropping a Subscription keeps the subscriber registered"]
pub struct Subscription {
    release: Option<Release>,
}

impl Subscription {
    pub(crate) fn new(release: Release) -> Self {
        Self {
            release: Some(release),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

struct State<T: ResourceData, P: ResourceProps> {
    resources: HashMap<String, Resource<T>>,
    producers: HashMap<String, Producer<T, P>>,
    consumers: HashMap<String, Vec<Consumer<T>>>,
    requests: HashMap<String, ConsumeOptions<P>>,
    usage: HashMap<String, usize>,
    // Bumped by `purge` so handles issued before it become inert.
    epoch: u64,
}

impl<T: ResourceData, P: ResourceProps> Default for State<T, P> {
    fn default() -> Self {
        Self {
            resources: HashMap::new(),
            producers: HashMap::new(),
            consumers: HashMap::new(),
            requests: HashMap::new(),
            usage: HashMap::new(),
            epoch: 0,
        }
    }
}

impl<T: ResourceData, P: ResourceProps> State<T, P> {
    fn consumers_of(&self, id: &str) -> Vec<Consumer<T>> {
        self.consumers.get(id).cloned().unwrap_or_default()
    }
}

struct Inner<T: ResourceData, P: ResourceProps> {
    config: StoreConfig,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<State<T, P>>,
}

impl<T: ResourceData, P: ResourceProps> Inner<T, P> {
    fn lock(&self) -> MutexGuard<'_, State<T, P>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The resource lifecycle engine.
///
/// `T` is the payload type shared by every resource of the store, `P` the props
/// type forwarded to producers. The store is a cheap handle: clones share the
/// same state.
///
/// ```rust
/// use async_resource::{source_fn, BoxError, Producer, ResourceStore, SourceRequest};
///
/// #[tokio::main]
/// async fn main() {
///     let store: ResourceStore<String> = ResourceStore::new();
///     store
///         .register(
///             "greeting",
///             Producer::new(source_fn(|_req: SourceRequest<String, _>| async move {
///                 Ok::<_, BoxError>("hello".to_string())
///             })),
///         )
///         .await;
///
///     let handle = store.consume("greeting", Default::default()).await.unwrap();
///     assert_eq!(store.get("greeting").unwrap().data.as_deref(), Some("hello"));
///     handle.stop();
/// }
/// ```
pub struct ResourceStore<T: ResourceData, P: ResourceProps = serde_json::Value> {
    inner: Arc<Inner<T, P>>,
}

impl<T: ResourceData, P: ResourceProps> Clone for ResourceStore<T, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ResourceData, P: ResourceProps> Default for ResourceStore<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ResourceData, P: ResourceProps> fmt::Debug for ResourceStore<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ResourceStore")
            .field("config", &self.inner.config)
            .field("resources", &state.resources.len())
            .finish_non_exhaustive()
    }
}

impl<T: ResourceData, P: ResourceProps> ResourceStore<T, P> {
    /// A store with in-memory cache storage and a Tokio scheduler.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_scheduler(config, Arc::new(TokioScheduler::new()))
    }

    pub fn with_scheduler(config: StoreConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                scheduler,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Cache key of `id` in storage.
    pub fn cache_key(&self, id: &str) -> String {
        self.inner.config.cache_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Resource<T>> {
        self.inner.lock().resources.get(id).cloned()
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.inner.lock().producers.contains_key(id)
    }

    /// Number of live `consume` handles for `id`.
    pub fn usage(&self, id: &str) -> usize {
        self.inner.lock().usage.get(id).copied().unwrap_or(0)
    }

    /// Registers (or re-registers) the producer of `id` and resets its state.
    ///
    /// Cache-backed producers read the cache first, emitting
    /// `{loading, cache}` and then either the cached data or the default
    /// snapshot. On a miss, a `consume` recorded before or during the read is
    /// replayed once with its remembered options; replays hold no usage count.
    pub async fn register(&self, id: impl Into<String>, producer: Producer<T, P>) -> CacheStatus {
        let id = id.into();
        let cache = producer.options.cache.clone();
        let ttl = producer.options.ttl;

        let (initial, consumers) = {
            let mut state = self.inner.lock();
            state.producers.insert(id.clone(), producer);
            let initial = match cache {
                Some(_) => Resource {
                    loading: true,
                    cache: true,
                    ..Resource::default()
                },
                None => Resource::default(),
            };
            state.resources.insert(id.clone(), initial.clone());
            (initial, state.consumers_of(&id))
        };
        info!(resource_id = %id, cached = cache.is_some(), ttl = ?ttl, "Registered");

        let Some(cache) = cache else {
            return CacheStatus::Disabled;
        };
        Self::notify(&consumers, &initial);

        let status = self.read_cache(&id, &cache).await;
        if status == CacheStatus::Miss {
            let pending = self.inner.lock().requests.get(&id).cloned();
            if let Some(options) = pending {
                debug!(resource_id = %id, "Replaying consume requested before cache miss");
                if let Err(e) = self.consume_with(&id, options, Trigger::Replay).await {
                    warn!(resource_id = %id, error = %e, "Replay failed");
                }
            }
        }
        status
    }

    /// Adds a subscriber and immediately replays the current snapshot to it,
    /// if `id` has one. Subscribing to an unregistered id is allowed.
    pub fn subscribe<F>(&self, id: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Resource<T>) + Send + Sync + 'static,
    {
        self.subscribe_consumer(id, Arc::new(callback))
    }

    /// Like [`subscribe`](Self::subscribe) but keeps the caller's `Arc`, so the
    /// same consumer can later be passed to [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe_consumer(&self, id: impl Into<String>, consumer: Consumer<T>) -> Subscription {
        let id = id.into();
        let current = {
            let mut state = self.inner.lock();
            state
                .consumers
                .entry(id.clone())
                .or_default()
                .push(Arc::clone(&consumer));
            state.resources.get(&id).cloned()
        };
        debug!(resource_id = %id, replayed = current.is_some(), "Subscribed");
        if let Some(resource) = &current {
            consumer(resource);
        }

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                Self::remove_consumer(&inner, &id, &consumer);
            }
        }))
    }

    /// Removes every registration of `consumer` (by identity) under `id`.
    pub fn unsubscribe(&self, id: &str, consumer: &Consumer<T>) {
        Self::remove_consumer(&self.inner, id, consumer);
    }

    fn remove_consumer(inner: &Inner<T, P>, id: &str, consumer: &Consumer<T>) {
        let mut state = inner.lock();
        if let Some(consumers) = state.consumers.get_mut(id) {
            consumers.retain(|c| !Arc::ptr_eq(c, consumer));
        }
        debug!(resource_id = %id, "Unsubscribed");
    }

    /// Ensures `id` is fetched, reusing an in-flight or loaded result unless
    /// `options.reload` is set.
    ///
    /// Producer failures do not surface here: they become an `error` snapshot.
    /// The only error is [`StoreError::NotRegistered`]; the options are
    /// remembered even then, so a later cache-backed registration can replay
    /// them.
    pub async fn consume(&self, id: &str, options: ConsumeOptions<P>) -> Result<ConsumeHandle, StoreError> {
        self.consume_with(id, options, Trigger::Caller).await
    }

    async fn consume_with(
        &self,
        id: &str,
        options: ConsumeOptions<P>,
        trigger: Trigger,
    ) -> Result<ConsumeHandle, StoreError> {
        debug!(resource_id = %id, ?options, ?trigger, "Consume");
        let started = {
            let mut state = self.inner.lock();
            state.requests.insert(id.to_string(), options.clone());

            let (Some(producer), Some(current)) = (
                state.producers.get(id).cloned(),
                state.resources.get(id).cloned(),
            ) else {
                warn!(resource_id = %id, "Not registered");
                return Err(StoreError::NotRegistered(id.to_string()));
            };

            let handle = match trigger {
                Trigger::Caller => {
                    *state.usage.entry(id.to_string()).or_insert(0) += 1;
                    self.usage_handle(id, state.epoch)
                }
                Trigger::Poll | Trigger::Replay => ConsumeHandle::detached(),
            };

            if let Some(ttl) = producer.options.ttl {
                self.schedule_refresh(id, ttl);
            }

            if current.loading {
                debug!(resource_id = %id, "Already loading");
                return Ok(handle);
            }
            if current.loaded && !options.reload && trigger != Trigger::Poll {
                debug!(resource_id = %id, "Already loaded");
                return Ok(handle);
            }

            let loading = current.with_loading(true);
            state.resources.insert(id.to_string(), loading.clone());
            (producer, current, loading, state.consumers_of(id), handle)
        };
        let (producer, current, loading, consumers, handle) = started;
        Self::notify(&consumers, &loading);

        let request = SourceRequest {
            props: options.props,
            resource: current,
        };
        match producer.source.fetch(request).await {
            Ok(data) => {
                info!(resource_id = %id, "Loaded");
                let record = producer.options.cache.as_ref().map(|cache| (cache, data.clone()));
                let committed = self.emit(id, Resource::loaded(data));
                if let (true, Some((cache, data))) = (committed, record) {
                    self.write_cache(id, cache, data).await;
                }
            }
            Err(e) => {
                warn!(resource_id = %id, error = %e, "Fetch failed");
                self.emit(id, Resource::failed(e.to_string()));
            }
        }
        Ok(handle)
    }

    /// Runs the producer's `update` with `props`.
    ///
    /// Emits `{updating: true}`, then the pre-update snapshot with the new data.
    /// On failure the pre-update snapshot is restored and the error returned.
    /// A call made while another update is in flight is a no-op.
    pub async fn update(&self, id: &str, props: P) -> Result<(), StoreError> {
        debug!(resource_id = %id, ?props, "Update");
        let started = {
            let mut state = self.inner.lock();
            let (Some(producer), Some(before)) = (
                state.producers.get(id).cloned(),
                state.resources.get(id).cloned(),
            ) else {
                warn!(resource_id = %id, "Not registered");
                return Err(StoreError::NotRegistered(id.to_string()));
            };
            if !producer.source.supports_update() {
                warn!(resource_id = %id, "Update not supported");
                return Err(StoreError::UpdateNotSupported(id.to_string()));
            }
            if before.updating {
                debug!(resource_id = %id, "Already updating");
                return Ok(());
            }
            let updating = before.with_updating(true);
            state.resources.insert(id.to_string(), updating.clone());
            (producer, before, updating, state.consumers_of(id))
        };
        let (producer, before, updating, consumers) = started;
        Self::notify(&consumers, &updating);

        let request = SourceRequest {
            props: Some(props),
            resource: before.clone(),
        };
        match producer.source.update(request).await {
            Ok(data) => {
                info!(resource_id = %id, "Updated");
                self.emit(
                    id,
                    Resource {
                        data: Some(data),
                        updating: false,
                        ..before
                    },
                );
                Ok(())
            }
            Err(e) => {
                warn!(resource_id = %id, error = %e, "Update failed, rolling back");
                self.emit(id, before);
                Err(StoreError::Update {
                    id: id.to_string(),
                    source: e,
                })
            }
        }
    }

    /// Forgets every resource, producer, subscriber and remembered request.
    ///
    /// Subscribers receive the default snapshot first, and the persisted cache
    /// entry of each cache-backed resource is removed. Pending TTL timers and
    /// usage counters are left alone; a timer that fires for a forgotten id
    /// does nothing. Use [`purge`](Self::purge) for a full reset.
    pub async fn clear(&self) {
        self.reset(false).await;
    }

    /// Resets the store to its freshly constructed state: everything
    /// [`clear`](Self::clear) does, plus cancelling every TTL timer and
    /// dropping every usage counter.
    pub async fn purge(&self) {
        self.reset(true).await;
    }

    async fn reset(&self, purge: bool) {
        let (producers, resources, consumers) = {
            let mut state = self.inner.lock();
            state.requests.clear();
            if purge {
                state.usage.clear();
                state.epoch += 1;
            }
            (
                std::mem::take(&mut state.producers),
                std::mem::take(&mut state.resources),
                std::mem::take(&mut state.consumers),
            )
        };
        if purge {
            self.inner.scheduler.cancel_all();
        }
        info!(resources = resources.len(), purge, "Clearing store");

        let cleared = Resource::default();
        for id in resources.keys() {
            if let Some(consumers) = consumers.get(id) {
                Self::notify(consumers, &cleared);
            }
        }

        for (id, producer) in &producers {
            if let Some(cache) = &producer.options.cache {
                let key = self.cache_key(id);
                if let Err(e) = self.storage_for(cache).remove(&key).await {
                    warn!(resource_id = %id, cache_key = %key, error = %e, "Failed to remove cache entry");
                }
            }
        }
    }

    // --- internals ---

    /// Replaces the snapshot of `id` and notifies its subscribers. Returns
    /// `false` (and does nothing) if `id` was cleared in the meantime.
    fn emit(&self, id: &str, resource: Resource<T>) -> bool {
        let consumers = {
            let mut state = self.inner.lock();
            let Some(slot) = state.resources.get_mut(id) else {
                debug!(resource_id = %id, "Dropped transition for cleared resource");
                return false;
            };
            *slot = resource.clone();
            state.consumers_of(id)
        };
        Self::notify(&consumers, &resource);
        true
    }

    fn notify(consumers: &[Consumer<T>], resource: &Resource<T>) {
        for consumer in consumers {
            consumer(resource);
        }
    }

    fn usage_handle(&self, id: &str, epoch: u64) -> ConsumeHandle {
        let weak: Weak<Inner<T, P>> = Arc::downgrade(&self.inner);
        let id = id.to_string();
        ConsumeHandle::new(Box::new(move || {
            let Some(inner) = weak.upgrade() else { return };
            let mut state = inner.lock();
            if state.epoch != epoch {
                return;
            }
            if let Some(count) = state.usage.get_mut(&id) {
                *count = count.saturating_sub(1);
                debug!(resource_id = %id, usage = *count, "Consumer stopped");
            }
        }))
    }

    fn schedule_refresh(&self, id: &str, ttl: Duration) {
        let weak = Arc::downgrade(&self.inner);
        let key = id.to_string();
        let task = Box::pin(async move {
            if let Some(inner) = weak.upgrade() {
                ResourceStore { inner }.refresh(&key).await;
            }
        });
        self.inner.scheduler.schedule(id, ttl, task);
    }

    async fn refresh(&self, id: &str) {
        let (usage, options) = {
            let state = self.inner.lock();
            (
                state.usage.get(id).copied().unwrap_or(0),
                state.requests.get(id).cloned(),
            )
        };
        if usage == 0 {
            debug!(resource_id = %id, "No active consumers, skipping refresh");
            return;
        }
        debug!(resource_id = %id, usage, "TTL refresh");
        if let Err(e) = self
            .consume_with(id, options.unwrap_or_default(), Trigger::Poll)
            .await
        {
            warn!(resource_id = %id, error = %e, "TTL refresh failed");
        }
    }

    fn storage_for(&self, cache: &CacheOptions) -> Arc<dyn Storage> {
        cache
            .storage
            .clone()
            .unwrap_or_else(|| Arc::clone(&self.inner.config.storage))
    }

    async fn read_cache(&self, id: &str, cache: &CacheOptions) -> CacheStatus {
        let key = self.cache_key(id);
        let record = match self.storage_for(cache).get(&key).await {
            Ok(Some(value)) => match serde_json::from_value::<CacheRecord<T>>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(resource_id = %id, cache_key = %key, error = %e, "Unreadable cache record");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(resource_id = %id, cache_key = %key, error = %e, "Cache read failed");
                None
            }
        };

        match record {
            Some(record) if cache.is_fresh(Duration::from_millis(record.age_millis())) => {
                info!(resource_id = %id, cache_key = %key, "Cache hit");
                self.emit(id, Resource::cached(record.data));
                CacheStatus::Hit
            }
            record => {
                debug!(resource_id = %id, cache_key = %key, expired = record.is_some(), "Cache miss");
                self.emit(id, Resource::default());
                CacheStatus::Miss
            }
        }
    }

    async fn write_cache(&self, id: &str, cache: &CacheOptions, data: T) {
        let key = self.cache_key(id);
        let value = match serde_json::to_value(CacheRecord::now(data)) {
            Ok(value) => value,
            Err(e) => {
                warn!(resource_id = %id, error = %e, "Failed to serialize cache record");
                return;
            }
        };
        match self.storage_for(cache).set(&key, value).await {
            Ok(()) => debug!(resource_id = %id, cache_key = %key, "Cached"),
            Err(e) => warn!(resource_id = %id, cache_key = %key, error = %e, "Cache write failed"),
        }
    }
}
