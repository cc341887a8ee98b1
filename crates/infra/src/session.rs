//! Per-session cache of the authenticated identity and its resolved role.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use callgrid_auth::{Identity, Role};
use callgrid_core::EmailAddress;

use crate::error::{AccessError, AuthError};
use crate::identity::IdentityProvider;
use crate::store::OrganizationBackend;

const MIN_PASSWORD_CHARS: usize = 8;
const MIN_FULL_NAME_CHARS: usize = 2;

/// Where the role lookup for the current identity stands.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum RoleResolution {
    /// Not fetched yet, invalidated, or the last fetch failed.
    #[default]
    Unresolved,
    /// Fetched; `None` means the store holds no role row for the identity.
    Resolved(Option<Role>),
}

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    role: RoleResolution,
    /// Bumped on every invalidation; a resolution started under an older
    /// generation never writes its result.
    generation: u64,
}

/// Authenticated identity plus its role, sourced from an [`IdentityProvider`]
/// and an [`OrganizationBackend`].
///
/// The role is never computed locally. It is fetched by user id and must be
/// re-fetched (see [`SessionContext::refresh`]) after any membership change.
pub struct SessionContext<B> {
    provider: Arc<dyn IdentityProvider>,
    backend: B,
    state: RwLock<SessionState>,
}

impl<B> std::fmt::Debug for SessionContext<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("SessionContext")
            .field("identity", &state.identity.as_ref().map(|i| i.user_id))
            .field("role", &state.role)
            .field("generation", &state.generation)
            .finish()
    }
}

impl<B> SessionContext<B>
where
    B: OrganizationBackend,
{
    pub fn new(provider: Arc<dyn IdentityProvider>, backend: B) -> Self {
        Self {
            provider,
            backend,
            state: RwLock::new(SessionState::default()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.read().identity.clone()
    }

    /// Resolved role, or `None` while unresolved or when no role exists.
    pub fn current_role(&self) -> Option<Role> {
        match self.read().role {
            RoleResolution::Resolved(role) => role,
            RoleResolution::Unresolved => None,
        }
    }

    pub fn role_resolution(&self) -> RoleResolution {
        self.read().role
    }

    /// True while an identity is present but its role is not known yet.
    /// Callers must hold rendering instead of treating this as allow or deny.
    pub fn is_loading(&self) -> bool {
        let state = self.read();
        state.identity.is_some() && state.role == RoleResolution::Unresolved
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = EmailAddress::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::Validation("password is required".to_string()));
        }

        let identity = self.provider.sign_in(&email, password)?;
        tracing::info!(user_id = %identity.user_id, "signed in");
        self.establish(identity.clone());
        Ok(identity)
    }

    /// Register a new account and sign it in. The profile is provisioned with
    /// the default `agent` role and no organization.
    pub fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Identity, AuthError> {
        let email = EmailAddress::parse(email)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AuthError::Validation(format!(
                "password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }
        let full_name = full_name.trim();
        if full_name.chars().count() < MIN_FULL_NAME_CHARS {
            return Err(AuthError::Validation(format!(
                "full name must be at least {MIN_FULL_NAME_CHARS} characters"
            )));
        }

        let identity = self.provider.sign_up(&email, password, full_name)?;
        tracing::info!(user_id = %identity.user_id, "signed up");
        self.establish(identity.clone());
        Ok(identity)
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        let identity = self.current_identity();
        if let Some(identity) = &identity {
            self.provider.sign_out(identity.user_id)?;
            tracing::info!(user_id = %identity.user_id, "signed out");
        }

        let mut state = self.write();
        state.identity = None;
        state.role = RoleResolution::Unresolved;
        state.generation += 1;
        Ok(())
    }

    /// Pick up the provider's persisted session, if any, and resolve its role.
    pub fn restore(&self) -> Result<Option<Identity>, AuthError> {
        let Some(identity) = self.provider.current_identity()? else {
            return Ok(None);
        };
        self.establish(identity.clone());
        Ok(Some(identity))
    }

    /// Drop the cached role. Any resolution still in flight is discarded.
    pub fn invalidate(&self) {
        let mut state = self.write();
        state.role = RoleResolution::Unresolved;
        state.generation += 1;
    }

    /// Fetch the role for the current identity.
    ///
    /// A backend failure leaves the role `Unresolved` so gating stays pending.
    pub fn resolve(&self) -> Result<(), AccessError> {
        let (identity, generation) = {
            let state = self.read();
            match &state.identity {
                Some(identity) => (identity.clone(), state.generation),
                None => return Ok(()),
            }
        };

        self.backend.ensure_profile(&identity)?;
        let role = self.backend.get_user_role(identity.user_id)?;

        let mut state = self.write();
        if state.generation != generation {
            tracing::debug!(user_id = %identity.user_id, "discarding stale role resolution");
            return Ok(());
        }
        state.role = RoleResolution::Resolved(role);
        Ok(())
    }

    pub fn refresh(&self) -> Result<(), AccessError> {
        self.invalidate();
        self.resolve()
    }

    fn establish(&self, identity: Identity) {
        {
            let mut state = self.write();
            state.identity = Some(identity);
            state.role = RoleResolution::Unresolved;
            state.generation += 1;
        }
        if let Err(err) = self.resolve() {
            tracing::warn!(error = %err, "role resolution failed; session stays pending");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
