//! Organization invites.
//!
//! ```text
//! (none) --issue--> Pending --accept--> Accepted
//!                      |
//!                      +--time passes expires_at--> Expired   (observed lazily)
//!                      +--cancel (row deleted)----> gone
//! ```
//!
//! Transitions are one-way: an accepted invite never becomes pending again, and
//! a deleted invite can no longer be looked up, so it can never be accepted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use callgrid_auth::Role;
use callgrid_core::{DomainError, DomainResult, EmailAddress, InviteId, OrganizationId, UserId};

use crate::token::InviteToken;

/// Invites expire a week after issue unless a different window is requested.
pub const DEFAULT_INVITE_TTL_DAYS: i64 = 7;

/// Longest lifetime an invite may be issued with.
pub const MAX_INVITE_TTL_DAYS: i64 = 365;

pub fn default_invite_ttl() -> Duration {
    Duration::days(DEFAULT_INVITE_TTL_DAYS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub id: InviteId,
    pub organization_id: OrganizationId,
    pub email: EmailAddress,
    pub role: Role,
    pub token: InviteToken,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteState {
    Pending,
    Accepted,
    Expired,
}

/// Request to issue an invite; validated by [`Invite::issue`].
#[derive(Debug, Clone)]
pub struct InviteRequest {
    pub organization_id: OrganizationId,
    pub email: String,
    pub role: Role,
    pub created_by: UserId,
    pub ttl: Duration,
}

impl Invite {
    /// Build a new pending invite with a fresh token.
    pub fn issue(request: &InviteRequest, now: DateTime<Utc>) -> DomainResult<Self> {
        Self::issue_with_token(request, InviteToken::generate(), now)
    }

    pub fn issue_with_token(
        request: &InviteRequest,
        token: InviteToken,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if !request.role.is_invitable() {
            return Err(DomainError::validation(format!(
                "role '{}' cannot be granted by invite",
                request.role
            )));
        }
        if request.ttl <= Duration::zero() {
            return Err(DomainError::validation("invite lifetime must be positive"));
        }
        if request.ttl > Duration::days(MAX_INVITE_TTL_DAYS) {
            return Err(DomainError::validation(format!(
                "invite lifetime must not exceed {MAX_INVITE_TTL_DAYS} days"
            )));
        }
        let email = EmailAddress::parse(&request.email)?;
        let expires_at = now
            .checked_add_signed(request.ttl)
            .ok_or_else(|| DomainError::validation("invite expiry is out of range"))?;

        Ok(Self {
            id: InviteId::new(),
            organization_id: request.organization_id,
            email,
            role: request.role,
            token,
            expires_at,
            accepted_at: None,
            created_by: request.created_by,
            created_at: now,
        })
    }

    /// Acceptance wins over expiry: an invite accepted in time stays accepted.
    pub fn state(&self, now: DateTime<Utc>) -> InviteState {
        if self.accepted_at.is_some() {
            InviteState::Accepted
        } else if now >= self.expires_at {
            InviteState::Expired
        } else {
            InviteState::Pending
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == InviteState::Pending
    }

    /// Invites bind acceptance to the exact (normalized) address they were sent to.
    pub fn is_addressed_to(&self, email: &EmailAddress) -> bool {
        &self.email == email
    }

    pub fn details(&self, organization_name: impl Into<String>, now: DateTime<Utc>) -> InviteDetails {
        InviteDetails {
            email: self.email.clone(),
            role: self.role,
            organization_name: organization_name.into(),
            expires_at: self.expires_at,
            is_valid: self.is_valid(now),
        }
    }
}

/// Read-only view shown on the invite landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteDetails {
    pub email: EmailAddress,
    pub role: Role,
    pub organization_name: String,
    pub expires_at: DateTime<Utc>,
    pub is_valid: bool,
}

/// Shareable link for an invite (`{origin}/invite?token={token}`).
pub fn invite_link(origin: &str, token: &InviteToken) -> String {
    format!("{}/invite?token={}", origin.trim_end_matches('/'), token.as_str())
}
