use serde::{Deserialize, Serialize};

use callgrid_core::{EmailAddress, UserId};

/// An authenticated principal, as reported by the identity provider.
///
/// The access-control core only reads identities; creating and verifying them
/// is the provider's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub email: EmailAddress,
    pub full_name: Option<String>,
}

impl Identity {
    pub fn new(user_id: UserId, email: EmailAddress) -> Self {
        Self {
            user_id,
            email,
            full_name: None,
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Name to show in UI: the full name when known, else the email.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(self.email.as_str())
    }
}
