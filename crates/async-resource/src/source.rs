//! # Producers
//!
//! A producer is the application code behind a resource: an async `fetch`,
//! optionally an async `update`, plus options describing how results are
//! cached and refreshed.
//!
//! The [`Source`] trait is the contract the store calls into. Implement it on a
//! type when the producer carries state (an HTTP client, a database handle), or
//! wrap plain async closures with [`source_fn`].
//!
//! # Provided Methods
//! [`Source::update`] and [`Source::supports_update`] have default
//! implementations. A producer that does not override them rejects updates;
//! the store checks [`Source::supports_update`] before touching any state.

use crate::error::BoxError;
use crate::model::{NamespaceResources, Resource, ResourceData, ResourceProps};
use crate::storage::Storage;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// What a producer receives on every call.
#[derive(Clone, Debug)]
pub struct SourceRequest<T, P> {
    /// Caller-supplied props (`consume` options or `update` argument).
    pub props: Option<P>,
    /// The snapshot current when the call was made.
    pub resource: Resource<T>,
}

/// Application code that fetches (and optionally mutates) a resource.
#[async_trait]
pub trait Source<T: ResourceData, P: ResourceProps>: Send + Sync + 'static {
    /// Produces fresh data.
    async fn fetch(&self, request: SourceRequest<T, P>) -> Result<T, BoxError>;

    /// Whether [`Source::update`] is implemented.
    fn supports_update(&self) -> bool {
        false
    }

    /// Applies a mutation and returns the new data.
    async fn update(&self, _request: SourceRequest<T, P>) -> Result<T, BoxError> {
        Err("update is not supported by this source".into())
    }
}

type BoxedFn<Req, T> = Box<dyn Fn(Req) -> BoxFuture<'static, Result<T, BoxError>> + Send + Sync>;

/// A [`Source`] built from async closures. See [`source_fn`].
pub struct FnSource<T, P> {
    fetch: BoxedFn<SourceRequest<T, P>, T>,
    update: Option<BoxedFn<SourceRequest<T, P>, T>>,
}

/// Wraps an async closure as a fetch-only [`Source`].
///
/// ```rust
/// use async_resource::{source_fn, BoxError, SourceRequest};
///
/// let source = source_fn(|_req: SourceRequest<String, ()>| async move {
///     Ok::<_, BoxError>("hello".to_string())
/// });
/// # let _ = source;
/// ```
pub fn source_fn<T, P, F, Fut>(fetch: F) -> FnSource<T, P>
where
    T: ResourceData,
    P: ResourceProps,
    F: Fn(SourceRequest<T, P>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
{
    FnSource {
        fetch: Box::new(move |request| -> BoxFuture<'static, Result<T, BoxError>> {
            Box::pin(fetch(request))
        }),
        update: None,
    }
}

impl<T: ResourceData, P: ResourceProps> FnSource<T, P> {
    /// Adds an update closure.
    pub fn with_update<F, Fut>(mut self, update: F) -> Self
    where
        F: Fn(SourceRequest<T, P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.update = Some(Box::new(
            move |request| -> BoxFuture<'static, Result<T, BoxError>> { Box::pin(update(request)) },
        ));
        self
    }
}

impl<T, P> fmt::Debug for FnSource<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSource")
            .field("update", &self.update.is_some())
            .finish()
    }
}

#[async_trait]
impl<T: ResourceData, P: ResourceProps> Source<T, P> for FnSource<T, P> {
    async fn fetch(&self, request: SourceRequest<T, P>) -> Result<T, BoxError> {
        (self.fetch)(request).await
    }

    fn supports_update(&self) -> bool {
        self.update.is_some()
    }

    async fn update(&self, request: SourceRequest<T, P>) -> Result<T, BoxError> {
        match &self.update {
            Some(update) => update(request).await,
            None => Err("update is not supported by this source".into()),
        }
    }
}

/// Cache settings of a producer.
#[derive(Clone, Default)]
pub struct CacheOptions {
    /// Backend to use instead of the store's default storage.
    pub storage: Option<Arc<dyn Storage>>,
    /// Maximum age of a cache record. `None` keeps records valid forever.
    pub ttl: Option<Duration>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Whether a record of the given age may still be served.
    pub fn is_fresh(&self, age: Duration) -> bool {
        self.ttl.map_or(true, |ttl| age < ttl)
    }
}

impl fmt::Debug for CacheOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheOptions")
            .field("custom_storage", &self.storage.is_some())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Options shared by plain and namespaced producers.
#[derive(Clone, Debug, Default)]
pub struct SourceOptions {
    /// Persist successful fetches and read them back on registration.
    pub cache: Option<CacheOptions>,
    /// Refresh interval while at least one consumer holds the resource.
    pub ttl: Option<Duration>,
}

/// A registered producer: the source plus its options.
pub struct Producer<T: ResourceData, P: ResourceProps> {
    pub(crate) source: Arc<dyn Source<T, P>>,
    pub(crate) options: SourceOptions,
}

impl<T: ResourceData, P: ResourceProps> Producer<T, P> {
    pub fn new(source: impl Source<T, P>) -> Self {
        Self::from_arc(Arc::new(source))
    }

    pub fn from_arc(source: Arc<dyn Source<T, P>>) -> Self {
        Self {
            source,
            options: SourceOptions::default(),
        }
    }

    pub fn cache(mut self, cache: CacheOptions) -> Self {
        self.options.cache = Some(cache);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.options.ttl = Some(ttl);
        self
    }

    pub fn options(&self) -> &SourceOptions {
        &self.options
    }
}

impl<T: ResourceData, P: ResourceProps> Clone for Producer<T, P> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            options: self.options.clone(),
        }
    }
}

impl<T: ResourceData, P: ResourceProps> fmt::Debug for Producer<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// --- Namespaced producers ---

/// What a namespaced producer receives on every call.
#[derive(Clone, Debug)]
pub struct NamespacedRequest<T, P> {
    pub props: Option<P>,
    pub resource: Resource<T>,
    /// The namespace being fetched.
    pub namespace: String,
    /// Snapshots of every sibling namespace materialized so far.
    pub resources: NamespaceResources<T>,
}

/// Application code that fetches one member of a family of resources.
#[async_trait]
pub trait NamespacedSource<T: ResourceData, P: ResourceProps>: Send + Sync + 'static {
    async fn fetch(&self, request: NamespacedRequest<T, P>) -> Result<T, BoxError>;
}

/// A [`NamespacedSource`] built from an async closure.
pub struct NamespacedFnSource<T, P> {
    fetch: BoxedFn<NamespacedRequest<T, P>, T>,
}

/// Wraps an async closure as a [`NamespacedSource`].
pub fn namespaced_source_fn<T, P, F, Fut>(fetch: F) -> NamespacedFnSource<T, P>
where
    T: ResourceData,
    P: ResourceProps,
    F: Fn(NamespacedRequest<T, P>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
{
    NamespacedFnSource {
        fetch: Box::new(move |request| -> BoxFuture<'static, Result<T, BoxError>> {
            Box::pin(fetch(request))
        }),
    }
}

#[async_trait]
impl<T: ResourceData, P: ResourceProps> NamespacedSource<T, P> for NamespacedFnSource<T, P> {
    async fn fetch(&self, request: NamespacedRequest<T, P>) -> Result<T, BoxError> {
        (self.fetch)(request).await
    }
}

/// A registered namespaced producer.
pub struct NamespacedProducer<T: ResourceData, P: ResourceProps> {
    pub(crate) source: Arc<dyn NamespacedSource<T, P>>,
    pub(crate) options: SourceOptions,
}

impl<T: ResourceData, P: ResourceProps> NamespacedProducer<T, P> {
    pub fn new(source: impl NamespacedSource<T, P>) -> Self {
        Self {
            source: Arc::new(source),
            options: SourceOptions::default(),
        }
    }

    pub fn cache(mut self, cache: CacheOptions) -> Self {
        self.options.cache = Some(cache);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.options.ttl = Some(ttl);
        self
    }
}

impl<T: ResourceData, P: ResourceProps> Clone for NamespacedProducer<T, P> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            options: self.options.clone(),
        }
    }
}
