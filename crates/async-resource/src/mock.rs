//! # Test Doubles
//!
//! Helpers for testing code built on the stores without real persistence.
//!
//! | Helper | Purpose |
//! |--------|---------|
//! | [`MockStorage`] | In-memory [`Storage`] that records calls and replays scripted responses |
//! | [`Recorder`] | Subscriber that keeps every value it is handed |
//!
//! ## Scripting Storage Failures
//!
//! Storage errors are hard to reproduce with a real backend. `MockStorage`
//! lets a test queue the response of the next call of a given kind; once the
//! queue is drained the mock behaves like [`MemoryStorage`].
//!
//! ```rust
//! use async_resource::mock::MockStorage;
//! use async_resource::storage::Storage;
//! use async_resource::StorageError;
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = MockStorage::new();
//!     storage
//!         .expect_get("userResource")
//!         .return_err(StorageError::Unavailable("disk on fire".into()));
//!
//!     assert!(storage.get("userResource").await.is_err());
//!     // queue drained: plain in-memory behaviour again
//!     assert!(storage.get("userResource").await.unwrap().is_none());
//!     storage.verify();
//! }
//! ```
//!
//! ## Recording Transitions
//!
//! ```rust,ignore
//! let recorder = Recorder::new();
//! let _subscription = store.subscribe("user", recorder.callback());
//! store.consume("user", Default::default()).await?;
//! assert_eq!(recorder.len(), 3); // default, loading, loaded
//! ```

use crate::error::StorageError;
use crate::storage::{MemoryStorage, Storage};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// One call observed by [`MockStorage`].
#[derive(Clone, Debug, PartialEq)]
pub enum StorageCall {
    Get(String),
    Set(String, Value),
    Remove(String),
    Clear,
}

enum Expectation {
    Get {
        key: String,
        response: Result<Option<Value>, StorageError>,
    },
    Set {
        key: String,
        response: Result<(), StorageError>,
    },
}

/// A [`Storage`] double with call recording and scripted responses.
#[derive(Default)]
pub struct MockStorage {
    backing: MemoryStorage,
    calls: Mutex<Vec<StorageCall>>,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `value` directly into the backing map without recording a call.
    pub async fn seed(&self, key: &str, value: Value) {
        // MemoryStorage never fails.
        let _ = self.backing.set(key, value).await;
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<StorageCall> {
        lock(&self.calls).clone()
    }

    /// Keys passed to `set`, in order.
    pub fn written_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StorageCall::Set(key, _) => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Scripts the response of the next `get`.
    pub fn expect_get(&self, key: &str) -> GetExpectationBuilder {
        GetExpectationBuilder {
            key: key.to_string(),
            expectations: Arc::clone(&self.expectations),
        }
    }

    /// Scripts the response of the next `set`.
    pub fn expect_set(&self, key: &str) -> SetExpectationBuilder {
        SetExpectationBuilder {
            key: key.to_string(),
            expectations: Arc::clone(&self.expectations),
        }
    }

    /// Panics if any scripted response was not consumed.
    pub fn verify(&self) {
        let remaining = lock(&self.expectations).len();
        if remaining > 0 {
            panic!("Not all storage expectations were met. {} remaining", remaining);
        }
    }

    fn record(&self, call: StorageCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.record(StorageCall::Get(key.to_string()));
        let scripted = {
            let mut expectations = lock(&self.expectations);
            match expectations.front() {
                Some(Expectation::Get { key: expected, .. }) if expected == key => expectations.pop_front(),
                _ => None,
            }
        };
        match scripted {
            Some(Expectation::Get { response, .. }) => response,
            _ => self.backing.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.record(StorageCall::Set(key.to_string(), value.clone()));
        let scripted = {
            let mut expectations = lock(&self.expectations);
            match expectations.front() {
                Some(Expectation::Set { key: expected, .. }) if expected == key => expectations.pop_front(),
                _ => None,
            }
        };
        match scripted {
            Some(Expectation::Set { response, .. }) => response,
            _ => self.backing.set(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.record(StorageCall::Remove(key.to_string()));
        self.backing.remove(key).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.record(StorageCall::Clear);
        self.backing.clear().await
    }
}

/// Builder for `get` expectations.
pub struct GetExpectationBuilder {
    key: String,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl GetExpectationBuilder {
    pub fn return_ok(self, value: Option<Value>) {
        lock(&self.expectations).push_back(Expectation::Get {
            key: self.key,
            response: Ok(value),
        });
    }

    pub fn return_err(self, error: StorageError) {
        lock(&self.expectations).push_back(Expectation::Get {
            key: self.key,
            response: Err(error),
        });
    }
}

/// Builder for `set` expectations.
pub struct SetExpectationBuilder {
    key: String,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl SetExpectationBuilder {
    pub fn return_err(self, error: StorageError) {
        lock(&self.expectations).push_back(Expectation::Set {
            key: self.key,
            response: Err(error),
        });
    }
}

/// Collects every value handed to its callback.
///
/// Works for resource subscribers (`Recorder<Resource<T>>`) and namespace
/// subscribers (`Recorder<NamespaceResources<T>>`) alike.
#[derive(Debug)]
pub struct Recorder<S> {
    seen: Arc<Mutex<Vec<S>>>,
}

impl<S> Clone for Recorder<S> {
    fn clone(&self) -> Self {
        Self {
            seen: Arc::clone(&self.seen),
        }
    }
}

impl<S> Default for Recorder<S> {
    fn default() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<S: Clone + Send + 'static> Recorder<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A subscriber callback feeding this recorder.
    pub fn callback(&self) -> impl Fn(&S) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |value: &S| lock(&seen).push(value.clone())
    }

    pub fn snapshots(&self) -> Vec<S> {
        lock(&self.seen).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.seen).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<S> {
        lock(&self.seen).last().cloned()
    }

    pub fn clear(&self) {
        lock(&self.seen).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn scripted_get_is_used_once_then_falls_back() {
        let storage = MockStorage::new();
        storage.seed("a", json!(1)).await;
        storage.expect_get("a").return_ok(None);

        assert_eq!(storage.get("a").await.unwrap(), None);
        assert_eq!(storage.get("a").await.unwrap(), Some(json!(1)));
        storage.verify();
        assert_eq!(
            storage.calls(),
            vec![StorageCall::Get("a".into()), StorageCall::Get("a".into())]
        );
    }

    #[tokio::test]
    async fn scripted_set_failure_does_not_write() {
        let storage = MockStorage::new();
        storage
            .expect_set("a")
            .return_err(StorageError::Unavailable("read-only".into()));

        assert!(storage.set("a", json!(1)).await.is_err());
        assert_eq!(storage.get("a").await.unwrap(), None);
        assert_eq!(storage.written_keys(), vec!["a".to_string()]);
    }

    #[test]
    #[should_panic(expected = "Not all storage expectations were met")]
    fn verify_panics_on_leftovers() {
        let storage = MockStorage::new();
        storage.expect_get("never").return_ok(None);
        storage.verify();
    }

    #[test]
    fn recorder_collects_in_order() {
        let recorder = Recorder::<u32>::new();
        let callback = recorder.callback();
        callback(&1);
        callback(&2);
        assert_eq!(recorder.snapshots(), vec![1, 2]);
        assert_eq!(recorder.last(), Some(2));
    }
}
