use crate::directory::Directory;
use crate::model::{ProfilePatch, UserProfile};
use async_resource::{BoxError, Source, SourceRequest};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Fetches and saves the profile through the directory.
pub struct ProfileSource {
    directory: Arc<Directory>,
}

impl ProfileSource {
    pub fn new(directory: Arc<Directory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Source<UserProfile, ProfilePatch> for ProfileSource {
    async fn fetch(&self, request: SourceRequest<UserProfile, ProfilePatch>) -> Result<UserProfile, BoxError> {
        debug!(cached = request.resource.cache, "Fetching profile");
        Ok(self.directory.fetch_profile().await?)
    }

    fn supports_update(&self) -> bool {
        true
    }

    async fn update(&self, request: SourceRequest<UserProfile, ProfilePatch>) -> Result<UserProfile, BoxError> {
        let patch = request.props.unwrap_or_default();
        Ok(self.directory.save_profile(&patch).await?)
    }
}
