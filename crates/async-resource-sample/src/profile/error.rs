use async_resource::StoreError;

/// Errors for profile operations.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Profile is not loaded yet")]
    NotLoaded,

    #[error("Profile failed to load: {0}")]
    LoadFailed(String),
}
