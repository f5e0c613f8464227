//! # Profile Client
//!
//! Provides a high-level API over the `user` resource.
use crate::model::{ProfilePatch, UserProfile};
use crate::profile::{ProfileError, PROFILE_ID};
use async_resource::{ConsumeHandle, ConsumeOptions, Resource, ResourceStore, Subscription};
use tracing::{debug, instrument};

/// Client for the profile resource.
#[derive(Clone, Debug)]
pub struct ProfileClient {
    store: ResourceStore<UserProfile, ProfilePatch>,
}

impl ProfileClient {
    pub fn new(store: ResourceStore<UserProfile, ProfilePatch>) -> Self {
        Self { store }
    }

    /// Makes sure the profile is loaded. Keep the handle while the profile is
    /// on screen so it stays on its refresh schedule.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<ConsumeHandle, ProfileError> {
        debug!("Sending request");
        Ok(self.store.consume(PROFILE_ID, ConsumeOptions::new()).await?)
    }

    /// Fetches the profile again even if it is loaded.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<ConsumeHandle, ProfileError> {
        debug!("Sending request");
        Ok(self.store.consume(PROFILE_ID, ConsumeOptions::new().reload()).await?)
    }

    /// Current snapshot of the profile resource.
    pub fn snapshot(&self) -> Resource<UserProfile> {
        self.store.get(PROFILE_ID).unwrap_or_default()
    }

    /// The loaded profile, or why there is none.
    pub fn profile(&self) -> Result<UserProfile, ProfileError> {
        let snapshot = self.snapshot();
        match (snapshot.data, snapshot.error) {
            (_, Some(message)) => Err(ProfileError::LoadFailed(message)),
            (Some(profile), None) => Ok(profile),
            (None, None) => Err(ProfileError::NotLoaded),
        }
    }

    #[instrument(skip(self))]
    pub async fn update(&self, patch: ProfilePatch) -> Result<UserProfile, ProfileError> {
        debug!("Sending request");
        self.store.update(PROFILE_ID, patch).await?;
        self.profile()
    }

    pub async fn rename(&self, name: impl Into<String>) -> Result<UserProfile, ProfileError> {
        self.update(ProfilePatch::name(name)).await
    }

    /// Calls `callback` with every profile snapshot, starting with the current one.
    pub fn watch<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Resource<UserProfile>) + Send + Sync + 'static,
    {
        self.store.subscribe(PROFILE_ID, callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Directory;
    use crate::profile;
    use async_resource::mock::{MockStorage, Recorder};
    use async_resource::{StorageError, StoreConfig, StoreError};
    use std::sync::Arc;
    use std::time::Duration;

    async fn client_over(directory: Arc<Directory>, storage: Arc<MockStorage>) -> ProfileClient {
        let store = ResourceStore::with_config(StoreConfig::new().storage(storage));
        store
            .register(PROFILE_ID, profile::producer(directory, Duration::from_secs(60)))
            .await;
        ProfileClient::new(store)
    }

    #[tokio::test]
    async fn test_profile_is_not_loaded_before_load() {
        let client = client_over(Arc::new(Directory::seeded()), Arc::new(MockStorage::new())).await;
        assert!(matches!(client.profile(), Err(ProfileError::NotLoaded)));
    }

    #[tokio::test]
    async fn test_load_fetches_and_persists() {
        let directory = Arc::new(Directory::seeded());
        let storage = Arc::new(MockStorage::new());
        let client = client_over(directory.clone(), storage.clone()).await;

        let handle = client.load().await.unwrap();
        handle.stop();

        assert_eq!(client.profile().unwrap().display_name(), "Bob Sponge");
        assert_eq!(directory.requests(), 1);
        assert_eq!(storage.written_keys(), vec!["userResource".to_string()]);
    }

    #[tokio::test]
    async fn test_cache_read_failure_falls_back_to_directory() {
        let directory = Arc::new(Directory::seeded());
        let storage = Arc::new(MockStorage::new());
        storage
            .expect_get("userResource")
            .return_err(StorageError::Unavailable("locked".into()));

        let client = client_over(directory.clone(), storage.clone()).await;
        client.load().await.unwrap().stop();

        assert_eq!(client.profile().unwrap().name, "Bob");
        assert_eq!(directory.requests(), 1);
        storage.verify();
    }

    #[tokio::test]
    async fn test_rename_goes_through_update() {
        let client = client_over(Arc::new(Directory::seeded()), Arc::new(MockStorage::new())).await;
        client.load().await.unwrap().stop();

        let recorder = Recorder::new();
        let _watch = client.watch(recorder.callback());
        let renamed = client.rename("John").await.unwrap();

        assert_eq!(renamed.name, "John");
        let snapshots = recorder.snapshots();
        assert_eq!(snapshots.len(), 3);
        assert!(snapshots[1].updating);
        assert_eq!(snapshots[2].data.as_ref().map(|p| p.name.as_str()), Some("John"));
    }

    #[tokio::test]
    async fn test_rejected_rename_keeps_old_profile() {
        let client = client_over(Arc::new(Directory::seeded()), Arc::new(MockStorage::new())).await;
        client.load().await.unwrap().stop();

        let result = client.rename("").await;
        match result {
            Err(ProfileError::Store(StoreError::Update { source, .. })) => {
                assert!(source.to_string().contains("name must not be empty"));
            }
            other => panic!("Expected update error, got {other:?}"),
        }
        assert_eq!(client.profile().unwrap().name, "Bob");
    }

    #[tokio::test]
    async fn test_offline_directory_surfaces_as_load_failure() {
        let directory = Arc::new(Directory::seeded());
        directory.set_offline(true);
        let client = client_over(directory, Arc::new(MockStorage::new())).await;

        client.load().await.unwrap().stop();
        match client.profile() {
            Err(ProfileError::LoadFailed(message)) => assert_eq!(message, "Directory is offline"),
            other => panic!("Expected LoadFailed, got {other:?}"),
        }
    }
}
