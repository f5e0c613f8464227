use serde::{Deserialize, Serialize};

/// The signed-in user's profile.
///
/// Served by the `user` resource, which is cache-backed: the last fetched
/// profile is persisted and shown immediately on the next start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub surname: String,
    pub email: String,
}

/// Fields to change on a [`UserProfile`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub surname: Option<String>,
}

impl UserProfile {
    pub fn new(name: impl Into<String>, surname: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            surname: surname.into(),
            email: email.into(),
        }
    }

    /// Returns a copy with the patch applied.
    pub fn apply(&self, patch: &ProfilePatch) -> Self {
        Self {
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            surname: patch.surname.clone().unwrap_or_else(|| self.surname.clone()),
            email: self.email.clone(),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

impl ProfilePatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            surname: None,
        }
    }
}
