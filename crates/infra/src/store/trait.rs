use std::sync::Arc;

use chrono::{DateTime, Utc};

use callgrid_auth::{Identity, Role};
use callgrid_core::{InviteId, OrganizationId, UserId};
use callgrid_org::{Invite, InviteToken, Member, NewOrganization, Organization, OrganizationPatch};

use crate::error::BackendError;

/// Operations the access-control core consumes from its backing store.
///
/// ## Guarantees required from implementations
///
/// - **Token uniqueness**: `insert_invite` fails with
///   [`BackendError::DuplicateToken`] instead of overwriting.
/// - **One open invite per address**: `insert_invite` refuses, with
///   [`BackendError::Constraint`], an invite whose (organization, email) already
///   has a pending invite or belongs to a member.
/// - **Accepted invites are kept**: `delete_invite` refuses an accepted row with
///   [`BackendError::AlreadyAccepted`].
/// - **Single acceptance**: `transactionally_accept_invite` is a conditional
///   update on `accepted_at`; of two concurrent calls for one token exactly
///   one returns `true` and exactly one membership is created.
/// - **Atomic founding**: `create_organization_with_founding_admin` inserts the
///   organization and grants the founder `super_admin` in one transaction.
/// - **Tenant scoping**: organization-scoped reads and writes only ever touch
///   rows of the given organization.
/// - **Owner retention**: `update_member_role` / `remove_member` refuse to
///   leave an organization without a `super_admin`
///   ([`BackendError::Constraint`]).
pub trait OrganizationBackend: Send + Sync {
    /// Make sure a profile exists for `identity` (idempotent).
    ///
    /// New profiles have no organization and the default `agent` role.
    fn ensure_profile(&self, identity: &Identity) -> Result<(), BackendError>;

    fn get_profile_organization_id(&self, user_id: UserId) -> Result<Option<OrganizationId>, BackendError>;

    fn get_organization(&self, organization_id: OrganizationId) -> Result<Option<Organization>, BackendError>;

    fn get_user_role(&self, user_id: UserId) -> Result<Option<Role>, BackendError>;

    fn list_organization_members(&self, organization_id: OrganizationId) -> Result<Vec<Member>, BackendError>;

    fn insert_invite(&self, invite: Invite) -> Result<(), BackendError>;

    fn list_invites(&self, organization_id: OrganizationId) -> Result<Vec<Invite>, BackendError>;

    /// Delete a not-yet-accepted invite of `organization_id`. Returns `false`
    /// when no such row exists in that organization.
    fn delete_invite(&self, organization_id: OrganizationId, invite_id: InviteId) -> Result<bool, BackendError>;

    fn get_invite_by_token(&self, token: &InviteToken) -> Result<Option<Invite>, BackendError>;

    /// Accept a pending invite for `user_id`: set `accepted_at`, link the profile
    /// to the invite's organization and grant the invite's role.
    ///
    /// Returns `false` when the invite is missing, already accepted or expired
    /// at `now`.
    fn transactionally_accept_invite(
        &self,
        token: &InviteToken,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, BackendError>;

    fn create_organization_with_founding_admin(
        &self,
        organization: &NewOrganization,
        founder: UserId,
        now: DateTime<Utc>,
    ) -> Result<OrganizationId, BackendError>;

    fn update_organization(
        &self,
        organization_id: OrganizationId,
        patch: &OrganizationPatch,
    ) -> Result<Organization, BackendError>;

    fn update_member_role(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: Role,
    ) -> Result<(), BackendError>;

    fn remove_member(&self, organization_id: OrganizationId, user_id: UserId) -> Result<(), BackendError>;
}

impl<S> OrganizationBackend for Arc<S>
where
    S: OrganizationBackend + ?Sized,
{
    fn ensure_profile(&self, identity: &Identity) -> Result<(), BackendError> {
        (**self).ensure_profile(identity)
    }

    fn get_profile_organization_id(&self, user_id: UserId) -> Result<Option<OrganizationId>, BackendError> {
        (**self).get_profile_organization_id(user_id)
    }

    fn get_organization(&self, organization_id: OrganizationId) -> Result<Option<Organization>, BackendError> {
        (**self).get_organization(organization_id)
    }

    fn get_user_role(&self, user_id: UserId) -> Result<Option<Role>, BackendError> {
        (**self).get_user_role(user_id)
    }

    fn list_organization_members(&self, organization_id: OrganizationId) -> Result<Vec<Member>, BackendError> {
        (**self).list_organization_members(organization_id)
    }

    fn insert_invite(&self, invite: Invite) -> Result<(), BackendError> {
        (**self).insert_invite(invite)
    }

    fn list_invites(&self, organization_id: OrganizationId) -> Result<Vec<Invite>, BackendError> {
        (**self).list_invites(organization_id)
    }

    fn delete_invite(&self, organization_id: OrganizationId, invite_id: InviteId) -> Result<bool, BackendError> {
        (**self).delete_invite(organization_id, invite_id)
    }

    fn get_invite_by_token(&self, token: &InviteToken) -> Result<Option<Invite>, BackendError> {
        (**self).get_invite_by_token(token)
    }

    fn transactionally_accept_invite(
        &self,
        token: &InviteToken,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, BackendError> {
        (**self).transactionally_accept_invite(token, user_id, now)
    }

    fn create_organization_with_founding_admin(
        &self,
        organization: &NewOrganization,
        founder: UserId,
        now: DateTime<Utc>,
    ) -> Result<OrganizationId, BackendError> {
        (**self).create_organization_with_founding_admin(organization, founder, now)
    }

    fn update_organization(
        &self,
        organization_id: OrganizationId,
        patch: &OrganizationPatch,
    ) -> Result<Organization, BackendError> {
        (**self).update_organization(organization_id, patch)
    }

    fn update_member_role(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: Role,
    ) -> Result<(), BackendError> {
        (**self).update_member_role(organization_id, user_id, role)
    }

    fn remove_member(&self, organization_id: OrganizationId, user_id: UserId) -> Result<(), BackendError> {
        (**self).remove_member(organization_id, user_id)
    }
}
