//! Error taxonomy surfaced to callers of the access-control services.

use thiserror::Error;

use callgrid_auth::AuthzError;
use callgrid_core::DomainError;

/// Failure reported by an [`OrganizationBackend`](crate::store::OrganizationBackend).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Opaque store failure (connection, timeout, poisoned lock, ...).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// An invite with the same token already exists.
    #[error("duplicate invite token")]
    DuplicateToken,

    /// The identity is already bound to an organization.
    #[error("user already belongs to an organization")]
    AlreadyInOrganization,

    /// The invite was accepted and can no longer be removed.
    #[error("invite already accepted")]
    AlreadyAccepted,

    /// A store-enforced invariant refused the write.
    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Error returned by session, membership and invite operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invite has expired")]
    Expired,

    #[error("invite has already been accepted")]
    AlreadyAccepted,

    #[error("user already belongs to an organization")]
    AlreadyInOrganization,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl AccessError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Stable, user-facing wording. Distinguishes an expired or unknown invite
    /// from one that was already used.
    pub fn user_message(&self) -> &'static str {
        match self {
            AccessError::Unauthenticated => "Please sign in to continue.",
            AccessError::Forbidden(_) => "You don't have access to do that.",
            AccessError::NotFound(_) => "This invite link is invalid or has been cancelled.",
            AccessError::Expired => "This invite has expired. Ask your administrator for a new one.",
            AccessError::AlreadyAccepted => "This invite has already been used.",
            AccessError::AlreadyInOrganization => "You already belong to an organization.",
            AccessError::Conflict(_) => "That change conflicts with the current state. Refresh and try again.",
            AccessError::Validation(_) => "Some of the information provided is invalid.",
            AccessError::Backend(_) => "Something went wrong on our side. Please try again.",
        }
    }
}

impl From<DomainError> for AccessError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => AccessError::Validation(msg),
            DomainError::InvariantViolation(msg) => AccessError::Conflict(msg),
        }
    }
}

impl From<BackendError> for AccessError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Unavailable(msg) => {
                tracing::error!(error = %msg, "backend failure");
                AccessError::Backend(msg)
            }
            BackendError::DuplicateToken => AccessError::Conflict("duplicate invite token".to_string()),
            BackendError::AlreadyInOrganization => AccessError::AlreadyInOrganization,
            BackendError::AlreadyAccepted => AccessError::AlreadyAccepted,
            BackendError::Constraint(msg) => AccessError::Conflict(msg),
            BackendError::NotFound(msg) => AccessError::NotFound(msg),
        }
    }
}

impl From<AuthzError> for AccessError {
    fn from(value: AuthzError) -> Self {
        AccessError::Forbidden(value.to_string())
    }
}

/// Expected sign-in / sign-up failures. Never a panic, never an opaque string
/// when the cause is known.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email already registered")]
    EmailAlreadyRegistered,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Other(String),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password. Please try again.".to_string(),
            AuthError::EmailAlreadyRegistered => {
                "An account with this email already exists. Please login instead.".to_string()
            }
            AuthError::Validation(msg) => msg.clone(),
            AuthError::Other(msg) => format!("Authentication failed: {msg}"),
        }
    }
}

impl From<DomainError> for AuthError {
    fn from(value: DomainError) -> Self {
        AuthError::Validation(value.to_string())
    }
}
