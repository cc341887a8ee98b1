//! Identity provider boundary (email + password authentication).

pub mod in_memory;

use std::sync::Arc;

use callgrid_auth::Identity;
use callgrid_core::{EmailAddress, UserId};

use crate::error::AuthError;

pub use in_memory::InMemoryIdentityProvider;

/// Authenticates users. Implementations report expected failures as typed
/// [`AuthError`] variants, never as panics.
pub trait IdentityProvider: Send + Sync {
    fn sign_in(&self, email: &EmailAddress, password: &str) -> Result<Identity, AuthError>;

    fn sign_up(&self, email: &EmailAddress, password: &str, full_name: &str) -> Result<Identity, AuthError>;

    fn sign_out(&self, user_id: UserId) -> Result<(), AuthError>;

    /// Identity of the provider's persisted session, if any (e.g. after a reload).
    fn current_identity(&self) -> Result<Option<Identity>, AuthError>;
}

impl<P> IdentityProvider for Arc<P>
where
    P: IdentityProvider + ?Sized,
{
    fn sign_in(&self, email: &EmailAddress, password: &str) -> Result<Identity, AuthError> {
        (**self).sign_in(email, password)
    }

    fn sign_up(&self, email: &EmailAddress, password: &str, full_name: &str) -> Result<Identity, AuthError> {
        (**self).sign_up(email, password, full_name)
    }

    fn sign_out(&self, user_id: UserId) -> Result<(), AuthError> {
        (**self).sign_out(user_id)
    }

    fn current_identity(&self) -> Result<Option<Identity>, AuthError> {
        (**self).current_identity()
    }
}
