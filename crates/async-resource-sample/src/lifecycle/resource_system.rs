use crate::accounts::{self, ACCOUNTS_ID};
use crate::clients::{AccountsClient, ProfileClient};
use crate::directory::Directory;
use crate::model::{Account, ProfilePatch, UserProfile};
use crate::profile::{self, PROFILE_ID};
use async_resource::storage::{MemoryStorage, Storage};
use async_resource::{CacheStatus, NamespaceStore, ResourceStore, StoreConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Settings of a [`ResourceSystem`].
#[derive(Clone)]
pub struct SystemConfig {
    /// Where cached resources are persisted.
    pub storage: Arc<dyn Storage>,
    /// Maximum age of a persisted profile.
    pub profile_cache_ttl: Duration,
    /// Refresh interval of the profile while it is loaded by someone.
    pub profile_refresh: Option<Duration>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            profile_cache_ttl: Duration::from_secs(5 * 60),
            profile_refresh: None,
        }
    }
}

/// The demo application's resources and clients.
pub struct ResourceSystem {
    pub profile_client: ProfileClient,
    pub accounts_client: AccountsClient,
    profiles: ResourceStore<UserProfile, ProfilePatch>,
    accounts: NamespaceStore<Account, ()>,
    directory: Arc<Directory>,
    config: SystemConfig,
}

impl ResourceSystem {
    pub async fn new(directory: Arc<Directory>) -> Self {
        Self::with_config(directory, SystemConfig::default()).await
    }

    pub async fn with_config(directory: Arc<Directory>, config: SystemConfig) -> Self {
        let store_config = StoreConfig::new().storage(Arc::clone(&config.storage));
        let profiles = ResourceStore::with_config(store_config.clone());
        let accounts = NamespaceStore::with_store(ResourceStore::with_config(store_config));

        let system = Self {
            profile_client: ProfileClient::new(profiles.clone()),
            accounts_client: AccountsClient::new(accounts.clone()),
            profiles,
            accounts,
            directory,
            config,
        };
        system.register().await;
        system
    }

    async fn register(&self) -> CacheStatus {
        let mut producer = profile::producer(Arc::clone(&self.directory), self.config.profile_cache_ttl);
        if let Some(refresh) = self.config.profile_refresh {
            producer = producer.ttl(refresh);
        }
        let status = self.profiles.register(PROFILE_ID, producer).await;
        self.accounts
            .register(ACCOUNTS_ID, accounts::producer(Arc::clone(&self.directory)));
        info!(profile_cache = ?status, "Resources registered");
        status
    }

    /// Whether the profile was served from the persisted cache at start-up.
    pub fn profile_from_cache(&self) -> bool {
        self.profile_client.snapshot().cache
    }

    /// Forgets every resource, persisted entries included, and registers the
    /// producers again. Subscribers receive the default snapshot and are dropped.
    pub async fn sign_out(&self) {
        info!("Signing out");
        self.accounts.clear();
        self.accounts.store().purge().await;
        self.profiles.purge().await;
        self.register().await;
    }

    /// Detaches namespace subscribers and drops the stores.
    pub fn shutdown(self) {
        self.accounts.clear();
        info!("Resource system shut down");
    }
}
