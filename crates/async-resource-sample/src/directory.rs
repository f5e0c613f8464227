//! # Directory Backend
//!
//! An in-process stand-in for the remote user directory the producers talk
//! to. It answers with a configurable latency, counts every request, and can
//! be switched offline to exercise the error paths.

use crate::model::{Account, ProfilePatch, UserProfile};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("No account registered for {0}")]
    UnknownAccount(String),

    #[error("Directory is offline")]
    Offline,

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),
}

#[derive(Debug)]
pub struct Directory {
    profile: Mutex<UserProfile>,
    accounts: Mutex<HashMap<String, Account>>,
    latency: Duration,
    offline: AtomicBool,
    requests: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Directory {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile: Mutex::new(profile),
            accounts: Mutex::new(HashMap::new()),
            latency: Duration::ZERO,
            offline: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        }
    }

    /// A directory with Bob's profile and two accounts.
    pub fn seeded() -> Self {
        let directory = Self::new(UserProfile::new("Bob", "Sponge", "bob@mail.com"));
        directory.add_account(Account::new("bob@mail.com", "Bob Sponge", 12_500));
        directory.add_account(Account::new("lucifer@mail.com", "Lucifer Morningstar", 66_600));
        directory
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn add_account(&self, account: Account) {
        lock(&self.accounts).insert(account.email.clone(), account);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of requests served (or refused) so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    async fn round_trip(&self) -> Result<(), DirectoryError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(DirectoryError::Offline);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Result<UserProfile, DirectoryError> {
        self.round_trip().await?;
        let profile = lock(&self.profile).clone();
        debug!(email = %profile.email, "Served profile");
        Ok(profile)
    }

    #[instrument(skip(self))]
    pub async fn save_profile(&self, patch: &ProfilePatch) -> Result<UserProfile, DirectoryError> {
        self.round_trip().await?;
        if patch.name.as_deref().is_some_and(str::is_empty) {
            return Err(DirectoryError::InvalidProfile("name must not be empty".into()));
        }
        let mut profile = lock(&self.profile);
        let updated = profile.apply(patch);
        *profile = updated;
        debug!(name = %profile.name, "Saved profile");
        Ok(profile.clone())
    }

    #[instrument(skip(self))]
    pub async fn fetch_account(&self, email: &str) -> Result<Account, DirectoryError> {
        self.round_trip().await?;
        lock(&self.accounts)
            .get(email)
            .cloned()
            .ok_or_else(|| DirectoryError::UnknownAccount(email.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_directory_refuses_requests() {
        let directory = Directory::seeded();
        directory.set_offline(true);
        assert!(matches!(directory.fetch_profile().await, Err(DirectoryError::Offline)));
        assert_eq!(directory.requests(), 1);
    }

    #[tokio::test]
    async fn empty_names_are_rejected() {
        let directory = Directory::seeded();
        let result = directory.save_profile(&ProfilePatch::name("")).await;
        assert!(matches!(result, Err(DirectoryError::InvalidProfile(_))));
        assert_eq!(directory.fetch_profile().await.unwrap().name, "Bob");
    }
}
