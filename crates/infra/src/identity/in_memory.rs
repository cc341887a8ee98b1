use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use callgrid_auth::Identity;
use callgrid_core::{EmailAddress, UserId};

use super::IdentityProvider;
use crate::error::AuthError;

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password_hash: String,
}

/// Argon2-backed in-memory identity provider for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    accounts: RwLock<HashMap<EmailAddress, Account>>,
    current: RwLock<Option<Identity>>,
    unavailable: AtomicBool,
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Other(format!("failed to hash password: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Other(format!("corrupt password hash: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Other(format!("failed to verify password: {e}"))),
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with [`AuthError::Other`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn remember(&self, identity: Option<Identity>) -> Result<(), AuthError> {
        let mut current = self
            .current
            .write()
            .map_err(|_| AuthError::Other("lock poisoned".to_string()))?;
        *current = identity;
        Ok(())
    }

    fn ensure_available(&self) -> Result<(), AuthError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::Other("identity provider unavailable".to_string()));
        }
        Ok(())
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn sign_in(&self, email: &EmailAddress, password: &str) -> Result<Identity, AuthError> {
        self.ensure_available()?;
        let account = {
            let accounts = self
                .accounts
                .read()
                .map_err(|_| AuthError::Other("lock poisoned".to_string()))?;
            accounts.get(email).cloned()
        };
        let Some(account) = account else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        self.remember(Some(account.identity.clone()))?;
        Ok(account.identity)
    }

    fn sign_up(&self, email: &EmailAddress, password: &str, full_name: &str) -> Result<Identity, AuthError> {
        self.ensure_available()?;
        let password_hash = hash_password(password)?;
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| AuthError::Other("lock poisoned".to_string()))?;
        if accounts.contains_key(email) {
            return Err(AuthError::EmailAlreadyRegistered);
        }
        let identity = Identity::new(UserId::new(), email.clone()).with_full_name(full_name);
        accounts.insert(
            email.clone(),
            Account {
                identity: identity.clone(),
                password_hash,
            },
        );
        drop(accounts);
        self.remember(Some(identity.clone()))?;
        Ok(identity)
    }

    fn sign_out(&self, user_id: UserId) -> Result<(), AuthError> {
        self.ensure_available()?;
        let signed_in = self.current_identity()?.is_some_and(|i| i.user_id == user_id);
        if signed_in {
            self.remember(None)?;
        }
        Ok(())
    }

    fn current_identity(&self) -> Result<Option<Identity>, AuthError> {
        self.ensure_available()?;
        self.current
            .read()
            .map(|current| current.clone())
            .map_err(|_| AuthError::Other("lock poisoned".to_string()))
    }
}
