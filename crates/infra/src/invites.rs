//! Invite lifecycle: create, inspect, accept, cancel.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use callgrid_auth::{Identity, Permission, Role};
use callgrid_core::{EmailAddress, InviteId, OrganizationId};
use callgrid_org::{Invite, InviteDetails, InviteRequest, InviteState, InviteToken, invite_link};

use crate::config::AccessConfig;
use crate::error::{AccessError, BackendError};
use crate::membership::OrganizationMembership;
use crate::store::OrganizationBackend;

/// Produces invite tokens. Swappable so tests can force collisions.
pub type TokenSource = Arc<dyn Fn() -> InviteToken + Send + Sync>;

/// Result of a successful acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedInvite {
    pub organization_id: OrganizationId,
    pub role: Role,
}

pub struct InviteLifecycle<B> {
    membership: Arc<OrganizationMembership<B>>,
    config: AccessConfig,
    token_source: TokenSource,
}

impl<B> std::fmt::Debug for InviteLifecycle<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InviteLifecycle")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn unknown_token() -> AccessError {
    AccessError::not_found("invite not found")
}

impl<B> InviteLifecycle<B>
where
    B: OrganizationBackend,
{
    pub fn new(membership: Arc<OrganizationMembership<B>>, config: AccessConfig) -> Self {
        Self {
            membership,
            config,
            token_source: Arc::new(InviteToken::generate),
        }
    }

    pub fn with_token_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> InviteToken + Send + Sync + 'static,
    {
        self.token_source = Arc::new(source);
        self
    }

    fn backend(&self) -> &B {
        self.membership.session().backend()
    }

    pub fn create_invite(
        &self,
        organization_id: OrganizationId,
        email: &str,
        role: Role,
    ) -> Result<Invite, AccessError> {
        self.create_invite_with_ttl(organization_id, email, role, self.config.invite_ttl())
    }

    /// Issue an invite that expires `ttl` after now.
    ///
    /// Requires `manage_team` in `organization_id`. Fails with `Conflict` when
    /// the address already has a pending invite or already belongs to a member.
    pub fn create_invite_with_ttl(
        &self,
        organization_id: OrganizationId,
        email: &str,
        role: Role,
        ttl: Duration,
    ) -> Result<Invite, AccessError> {
        let caller = self.membership.caller()?;
        caller.require(organization_id, Permission::ManageTeam)?;

        let request = InviteRequest {
            organization_id,
            email: email.to_string(),
            role,
            created_by: caller.user_id(),
            ttl,
        };
        let now = Utc::now();
        let mut invite = Invite::issue_with_token(&request, (self.token_source)(), now)?;

        self.ensure_not_invited(organization_id, &invite.email, now)?;

        let attempts = self.config.invite_token_attempts.max(1);
        for attempt in 1..=attempts {
            match self.backend().insert_invite(invite.clone()) {
                Ok(()) => {
                    tracing::info!(
                        organization_id = %organization_id,
                        invite_id = %invite.id,
                        role = %invite.role,
                        expires_at = %invite.expires_at,
                        "invite created"
                    );
                    return Ok(invite);
                }
                Err(BackendError::DuplicateToken) => {
                    tracing::warn!(attempt, "invite token collision; regenerating");
                    invite.token = (self.token_source)();
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AccessError::conflict(format!(
            "no unique invite token after {attempts} attempts"
        )))
    }

    /// Landing-page view of an invite. Unknown or malformed tokens are `NotFound`.
    pub fn get_invite_details(&self, token: &str) -> Result<InviteDetails, AccessError> {
        let token = InviteToken::parse(token).map_err(|_| unknown_token())?;
        let invite = self.backend().get_invite_by_token(&token)?.ok_or_else(unknown_token)?;
        let organization = self
            .backend()
            .get_organization(invite.organization_id)?
            .ok_or_else(|| AccessError::not_found(format!("organization {}", invite.organization_id)))?;
        Ok(invite.details(organization.name, Utc::now()))
    }

    /// Accept `token` as `identity`, which must be the session's signed-in
    /// identity.
    ///
    /// Exactly one of several concurrent acceptances succeeds; the others see
    /// `AlreadyAccepted`. On success the session and membership caches are
    /// re-resolved.
    pub fn accept_invite(&self, token: &str, identity: &Identity) -> Result<AcceptedInvite, AccessError> {
        let signed_in = self
            .membership
            .session()
            .current_identity()
            .ok_or(AccessError::Unauthenticated)?;
        if signed_in.user_id != identity.user_id || signed_in.email != identity.email {
            tracing::warn!(
                user_id = %identity.user_id,
                signed_in = %signed_in.user_id,
                "invite acceptance for an identity other than the signed-in one"
            );
            return Err(AccessError::forbidden("identity is not the signed-in user"));
        }
        let identity = &signed_in;

        let token = InviteToken::parse(token).map_err(|_| unknown_token())?;
        let invite = self.backend().get_invite_by_token(&token)?.ok_or_else(unknown_token)?;

        let now = Utc::now();
        match invite.state(now) {
            InviteState::Accepted => return Err(AccessError::AlreadyAccepted),
            InviteState::Expired => return Err(AccessError::Expired),
            InviteState::Pending => {}
        }
        if !invite.is_addressed_to(&identity.email) {
            tracing::warn!(
                invite_id = %invite.id,
                user_id = %identity.user_id,
                "invite accepted with a different email"
            );
            return Err(AccessError::forbidden("invite was sent to a different email address"));
        }

        self.backend().ensure_profile(identity)?;
        if self.backend().get_profile_organization_id(identity.user_id)?.is_some() {
            return Err(self.explain_lost_acceptance(&token, AccessError::AlreadyInOrganization));
        }

        match self
            .backend()
            .transactionally_accept_invite(&token, identity.user_id, now)
        {
            Ok(true) => {}
            Ok(false) => {
                return Err(self.explain_lost_acceptance(
                    &token,
                    AccessError::conflict("invite acceptance did not apply"),
                ));
            }
            Err(BackendError::AlreadyInOrganization) => {
                return Err(self.explain_lost_acceptance(&token, AccessError::AlreadyInOrganization));
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(
            invite_id = %invite.id,
            organization_id = %invite.organization_id,
            user_id = %identity.user_id,
            role = %invite.role,
            "invite accepted"
        );

        self.membership.refresh_session();
        self.membership.refresh_logged();

        Ok(AcceptedInvite {
            organization_id: invite.organization_id,
            role: invite.role,
        })
    }

    /// Delete a not-yet-accepted invite of the caller's organization.
    pub fn cancel_invite(&self, invite_id: InviteId) -> Result<(), AccessError> {
        let caller = self.membership.caller()?;
        let organization_id = caller
            .organization_id
            .ok_or_else(|| AccessError::forbidden("not a member of any organization"))?;
        caller.require(organization_id, Permission::ManageTeam)?;

        if !self.backend().delete_invite(organization_id, invite_id)? {
            return Err(AccessError::not_found(format!("invite {invite_id}")));
        }
        tracing::info!(organization_id = %organization_id, invite_id = %invite_id, "invite cancelled");
        Ok(())
    }

    /// Shareable link for `invite`.
    pub fn invite_link(&self, invite: &Invite) -> String {
        invite_link(&self.config.app_origin, &invite.token)
    }

    fn ensure_not_invited(
        &self,
        organization_id: OrganizationId,
        email: &EmailAddress,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), AccessError> {
        let is_member = self
            .backend()
            .list_organization_members(organization_id)?
            .iter()
            .any(|member| &member.email == email);
        if is_member {
            return Err(AccessError::conflict(format!("{email} is already a member")));
        }

        let has_pending = self
            .backend()
            .list_invites(organization_id)?
            .iter()
            .any(|invite| invite.is_addressed_to(email) && invite.is_valid(now));
        if has_pending {
            return Err(AccessError::conflict(format!("{email} already has a pending invite")));
        }
        Ok(())
    }

    /// Acceptance was refused after the invite looked pending: re-read it to
    /// report the race that was lost. An invite accepted in the meantime wins
    /// over `otherwise`.
    fn explain_lost_acceptance(&self, token: &InviteToken, otherwise: AccessError) -> AccessError {
        match self.backend().get_invite_by_token(token) {
            Ok(None) => unknown_token(),
            Ok(Some(invite)) => match invite.state(Utc::now()) {
                InviteState::Accepted => AccessError::AlreadyAccepted,
                InviteState::Expired => AccessError::Expired,
                InviteState::Pending => otherwise,
            },
            Err(err) => err.into(),
        }
    }
}
