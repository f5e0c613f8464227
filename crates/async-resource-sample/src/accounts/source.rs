use crate::directory::Directory;
use crate::model::Account;
use async_resource::{BoxError, NamespacedRequest, NamespacedSource};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Looks an account up by the e-mail address used as namespace.
pub struct AccountsSource {
    directory: Arc<Directory>,
}

impl AccountsSource {
    pub fn new(directory: Arc<Directory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl NamespacedSource<Account, ()> for AccountsSource {
    async fn fetch(&self, request: NamespacedRequest<Account, ()>) -> Result<Account, BoxError> {
        debug!(email = %request.namespace, known = request.resources.len(), "Fetching account");
        Ok(self.directory.fetch_account(&request.namespace).await?)
    }
}
