//! # Deferred Work
//!
//! TTL refreshes are deferred tasks keyed by resource identifier. The
//! [`Scheduler`] trait captures exactly what the store needs from a timer
//! facility: at most one pending task per key, cancel by key, cancel all.
//!
//! [`TokioScheduler`] is the default implementation. It must be used from
//! within a Tokio runtime.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// A unit of deferred work.
pub type Task = BoxFuture<'static, ()>;

/// Keyed, cancellable, one-shot timers.
pub trait Scheduler: Send + Sync {
    /// Runs `task` after `delay` unless a task is already pending for `key`.
    ///
    /// Returns `false` (and drops `task`) when one is already pending. The
    /// pending entry is cleared right before the task starts running, so the
    /// task itself may schedule a follow-up under the same key.
    fn schedule(&self, key: &str, delay: Duration, task: Task) -> bool;

    /// Cancels the pending task for `key`. Returns whether one was pending.
    fn cancel(&self, key: &str) -> bool;

    /// Cancels every pending task.
    fn cancel_all(&self);

    fn is_scheduled(&self, key: &str) -> bool;
}

type Entries = HashMap<String, (u64, JoinHandle<()>)>;

// Delays past the runtime's clock range are clamped to roughly thirty years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// [`Scheduler`] backed by `tokio::time::sleep` tasks.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    entries: Arc<Mutex<Entries>>,
    next_token: AtomicU64,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
        entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, key: &str, delay: Duration, task: Task) -> bool {
        let mut entries = Self::lock(&self.entries);
        if entries.contains_key(key) {
            trace!(key, "Already scheduled");
            return false;
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(&self.entries);
        let owned_key = key.to_string();
        let now = tokio::time::Instant::now();
        let deadline = now.checked_add(delay).unwrap_or(now + FAR_FUTURE);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut entries = Self::lock(&shared);
                // Only clear our own entry; a cancel + reschedule may have replaced it.
                if entries.get(&owned_key).map(|(t, _)| *t) == Some(token) {
                    entries.remove(&owned_key);
                }
            }
            trace!(key = %owned_key, "Fired");
            task.await;
        });
        entries.insert(key.to_string(), (token, handle));
        trace!(key, ?delay, "Scheduled");
        true
    }

    fn cancel(&self, key: &str) -> bool {
        match Self::lock(&self.entries).remove(key) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    fn cancel_all(&self) {
        for (_, (_, handle)) in Self::lock(&self.entries).drain() {
            handle.abort();
        }
    }

    fn is_scheduled(&self, key: &str) -> bool {
        Self::lock(&self.entries).contains_key(key)
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
