//! # Accounts Client
//!
//! Provides a high-level API over the `accounts` namespaced resource.
use crate::accounts::{AccountsError, ACCOUNTS_ID};
use crate::model::Account;
use async_resource::{
    ConsumeHandle, ConsumeOptions, NamespaceResources, NamespaceStore, Subscription, Summary,
};
use tracing::{debug, instrument};

/// Client for the accounts family.
#[derive(Clone, Debug)]
pub struct AccountsClient {
    store: NamespaceStore<Account, ()>,
}

impl AccountsClient {
    pub fn new(store: NamespaceStore<Account, ()>) -> Self {
        Self { store }
    }

    /// Makes sure the account of `email` is loaded.
    #[instrument(skip(self))]
    pub async fn load(&self, email: &str) -> Result<ConsumeHandle, AccountsError> {
        debug!("Sending request");
        Ok(self.store.consume(ACCOUNTS_ID, email, ConsumeOptions::new()).await?)
    }

    /// The loaded account of `email`, or why there is none.
    pub fn account(&self, email: &str) -> Result<Account, AccountsError> {
        let resources = self.store.resources(ACCOUNTS_ID);
        let Some(resource) = resources.get(email) else {
            return Err(AccountsError::NotLoaded(email.to_string()));
        };
        match (&resource.data, &resource.error) {
            (_, Some(message)) => Err(AccountsError::LoadFailed {
                email: email.to_string(),
                message: message.clone(),
            }),
            (Some(account), None) => Ok(account.clone()),
            (None, None) => Err(AccountsError::NotLoaded(email.to_string())),
        }
    }

    /// Addresses looked up so far, in lookup order.
    pub fn emails(&self) -> Vec<String> {
        self.store.namespaces(ACCOUNTS_ID).unwrap_or_default()
    }

    /// Accumulated status of every account looked up so far.
    pub fn summary(&self) -> Summary {
        self.store.resources(ACCOUNTS_ID).summary()
    }

    /// Calls `callback` with every account snapshot on each change.
    pub fn watch<F>(&self, callback: F) -> Result<Subscription, AccountsError>
    where
        F: Fn(&NamespaceResources<Account>) + Send + Sync + 'static,
    {
        Ok(self.store.subscribe(ACCOUNTS_ID, callback)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts;
    use crate::directory::Directory;
    use std::sync::Arc;

    fn client() -> AccountsClient {
        let store = NamespaceStore::new();
        store.register(ACCOUNTS_ID, accounts::producer(Arc::new(Directory::seeded())));
        AccountsClient::new(store)
    }

    #[tokio::test]
    async fn test_unknown_address_is_a_load_failure() {
        let client = client();
        client.load("nobody@mail.com").await.unwrap().stop();

        match client.account("nobody@mail.com") {
            Err(AccountsError::LoadFailed { email, message }) => {
                assert_eq!(email, "nobody@mail.com");
                assert_eq!(message, "No account registered for nobody@mail.com");
            }
            other => panic!("Expected LoadFailed, got {other:?}"),
        }
        assert!(client.summary().error.is_some());
    }

    #[tokio::test]
    async fn test_accounts_are_listed_in_lookup_order() {
        let client = client();
        client.load("lucifer@mail.com").await.unwrap().stop();
        client.load("bob@mail.com").await.unwrap().stop();

        assert_eq!(client.emails(), vec!["lucifer@mail.com", "bob@mail.com"]);
        assert_eq!(client.account("bob@mail.com").unwrap().balance_cents, 12_500);
        assert!(client.summary().loaded);
    }

    #[test]
    fn test_lookup_before_load_is_not_loaded() {
        let client = client();
        assert!(matches!(
            client.account("bob@mail.com"),
            Err(AccountsError::NotLoaded(_))
        ));
        assert!(client.emails().is_empty());
    }
}
