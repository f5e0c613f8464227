use serde::{Deserialize, Serialize};

/// An account of the directory, keyed by e-mail address.
///
/// Accounts are served by the `accounts` namespaced resource: one member per
/// e-mail address, created the first time that address is looked up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub owner: String,
    pub balance_cents: i64,
}

impl Account {
    pub fn new(email: impl Into<String>, owner: impl Into<String>, balance_cents: i64) -> Self {
        Self {
            email: email.into(),
            owner: owner.into(),
            balance_cents,
        }
    }
}
