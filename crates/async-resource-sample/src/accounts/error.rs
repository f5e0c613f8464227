use async_resource::StoreError;

/// Errors for account lookups.
#[derive(Debug, thiserror::Error)]
pub enum AccountsError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Account {0} is not loaded yet")]
    NotLoaded(String),

    #[error("Account {email} failed to load: {message}")]
    LoadFailed { email: String, message: String },
}
