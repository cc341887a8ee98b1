//! Which organization the current identity belongs to, plus the
//! organization-scoped queries and mutations (members, settings, invites).

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use callgrid_auth::{AccessGate, GateDecision, Identity, Permission, Role, authorize};
use callgrid_core::{OrganizationId, UserId};
use callgrid_org::{
    Invite, Member, MemberChange, NewOrganization, Organization, OrganizationPatch, OrganizationState,
    ensure_super_admin_remains,
};

use crate::error::AccessError;
use crate::session::SessionContext;
use crate::store::OrganizationBackend;

#[derive(Debug, Default)]
struct MembershipCache {
    state: OrganizationState,
    generation: u64,
}

/// Facts about the caller, read fresh from the backend for every
/// authorization decision.
#[derive(Debug, Clone)]
pub(crate) struct Caller {
    pub(crate) identity: Identity,
    pub(crate) role: Option<Role>,
    pub(crate) organization_id: Option<OrganizationId>,
}

impl Caller {
    pub(crate) fn user_id(&self) -> UserId {
        self.identity.user_id
    }

    /// Fails with `Forbidden` unless the caller belongs to `organization_id`.
    pub(crate) fn require_member_of(&self, organization_id: OrganizationId) -> Result<(), AccessError> {
        if self.organization_id == Some(organization_id) {
            Ok(())
        } else {
            Err(AccessError::forbidden(format!(
                "not a member of organization {organization_id}"
            )))
        }
    }

    pub(crate) fn require(&self, organization_id: OrganizationId, permission: Permission) -> Result<(), AccessError> {
        self.require_member_of(organization_id)?;
        authorize(self.role, permission)?;
        Ok(())
    }
}

pub struct OrganizationMembership<B> {
    session: Arc<SessionContext<B>>,
    cache: RwLock<MembershipCache>,
}

impl<B> std::fmt::Debug for OrganizationMembership<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("OrganizationMembership")
            .field("state", &cache.state.status())
            .field("generation", &cache.generation)
            .finish()
    }
}

impl<B> OrganizationMembership<B>
where
    B: OrganizationBackend,
{
    pub fn new(session: Arc<SessionContext<B>>) -> Self {
        Self {
            session,
            cache: RwLock::new(MembershipCache::default()),
        }
    }

    pub fn session(&self) -> &Arc<SessionContext<B>> {
        &self.session
    }

    fn backend(&self) -> &B {
        self.session.backend()
    }

    pub fn state(&self) -> OrganizationState {
        self.read().state.clone()
    }

    pub fn current_organization(&self) -> Option<Organization> {
        self.read().state.organization().cloned()
    }

    /// `None` while unresolved; callers must not read that as "no organization".
    pub fn has_organization(&self) -> Option<bool> {
        self.read().state.has_organization()
    }

    pub fn invalidate(&self) {
        let mut cache = self.write();
        cache.state = OrganizationState::Unresolved;
        cache.generation += 1;
    }

    /// Look up the current identity's organization.
    ///
    /// Without an identity the state stays `Unresolved`. A backend failure
    /// also leaves it `Unresolved`.
    pub fn resolve(&self) -> Result<(), AccessError> {
        let generation = self.read().generation;
        let Some(identity) = self.session.current_identity() else {
            return Ok(());
        };

        let resolved = match self.backend().get_profile_organization_id(identity.user_id)? {
            None => OrganizationState::Absent,
            Some(organization_id) => match self.backend().get_organization(organization_id)? {
                Some(organization) => OrganizationState::Present(organization),
                None => {
                    tracing::warn!(
                        user_id = %identity.user_id,
                        organization_id = %organization_id,
                        "profile links to a missing organization"
                    );
                    OrganizationState::Absent
                }
            },
        };

        let mut cache = self.write();
        if cache.generation != generation {
            tracing::debug!(user_id = %identity.user_id, "discarding stale organization resolution");
            return Ok(());
        }
        cache.state = resolved;
        Ok(())
    }

    pub fn refresh(&self) -> Result<(), AccessError> {
        self.invalidate();
        self.resolve()
    }

    /// Gate a navigation attempt against the live session.
    pub fn decide(&self, gate: &AccessGate, path: &str) -> GateDecision {
        let identity = self.session.current_identity();
        gate.decide(
            identity.as_ref(),
            self.session.current_role(),
            self.read().state.status(),
            path,
        )
    }

    pub fn decide_settings_section(&self, gate: &AccessGate, section_id: &str) -> GateDecision {
        let identity = self.session.current_identity();
        gate.decide_settings_section(
            identity.as_ref(),
            self.session.current_role(),
            self.read().state.status(),
            section_id,
        )
    }

    pub fn fetch_members(&self, organization_id: OrganizationId) -> Result<Vec<Member>, AccessError> {
        let caller = self.caller()?;
        caller.require_member_of(organization_id)?;
        Ok(self.backend().list_organization_members(organization_id)?)
    }

    /// Change `target`'s role. Only a super_admin of `organization_id` may do
    /// this, and the organization always keeps at least one super_admin.
    pub fn update_member_role(
        &self,
        organization_id: OrganizationId,
        target: UserId,
        role: Role,
    ) -> Result<(), AccessError> {
        let caller = self.super_admin_of(organization_id)?;
        self.check_member_change(organization_id, target, MemberChange::SetRole(role))?;

        self.backend().update_member_role(organization_id, target, role)?;
        tracing::info!(
            organization_id = %organization_id,
            user_id = %target,
            role = %role,
            "member role updated"
        );

        if target == caller.user_id() {
            self.refresh_session();
        }
        Ok(())
    }

    pub fn remove_member(&self, organization_id: OrganizationId, target: UserId) -> Result<(), AccessError> {
        let caller = self.super_admin_of(organization_id)?;
        self.check_member_change(organization_id, target, MemberChange::Remove)?;

        self.backend().remove_member(organization_id, target)?;
        tracing::info!(organization_id = %organization_id, user_id = %target, "member removed");

        if target == caller.user_id() {
            self.refresh_session();
            self.refresh_logged();
        }
        Ok(())
    }

    /// Found a new organization with the caller as its `super_admin`.
    pub fn create_organization(
        &self,
        name: &str,
        industry: Option<&str>,
        website: Option<&str>,
    ) -> Result<Organization, AccessError> {
        let caller = self.caller()?;
        if caller.organization_id.is_some() {
            return Err(AccessError::AlreadyInOrganization);
        }
        let new_organization = NewOrganization::new(name, industry, website)?;

        let organization_id = self.backend().create_organization_with_founding_admin(
            &new_organization,
            caller.user_id(),
            Utc::now(),
        )?;
        let organization = self
            .backend()
            .get_organization(organization_id)?
            .ok_or_else(|| AccessError::not_found(format!("organization {organization_id}")))?;

        tracing::info!(
            organization_id = %organization.id,
            slug = %organization.slug,
            founder = %caller.user_id(),
            "organization created"
        );

        self.refresh_session();
        {
            let mut cache = self.write();
            cache.generation += 1;
            cache.state = OrganizationState::Present(organization.clone());
        }
        Ok(organization)
    }

    /// Edit name, industry or website. Requires `manage_organization`.
    pub fn update_organization(
        &self,
        organization_id: OrganizationId,
        patch: &OrganizationPatch,
    ) -> Result<Organization, AccessError> {
        let caller = self.caller()?;
        caller.require(organization_id, Permission::ManageOrganization)?;
        let patch = patch.validated()?;

        let updated = if patch.is_empty() {
            self.backend()
                .get_organization(organization_id)?
                .ok_or_else(|| AccessError::not_found(format!("organization {organization_id}")))?
        } else {
            self.backend().update_organization(organization_id, &patch)?
        };

        let mut cache = self.write();
        if matches!(&cache.state, OrganizationState::Present(current) if current.id == organization_id) {
            cache.state = OrganizationState::Present(updated.clone());
        }
        Ok(updated)
    }

    /// All invites of `organization_id`, newest first. Requires `manage_team`.
    pub fn fetch_invites(&self, organization_id: OrganizationId) -> Result<Vec<Invite>, AccessError> {
        let caller = self.caller()?;
        caller.require(organization_id, Permission::ManageTeam)?;
        let mut invites = self.backend().list_invites(organization_id)?;
        invites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invites)
    }

    /// Invites that can still be accepted right now.
    pub fn pending_invites(&self, organization_id: OrganizationId) -> Result<Vec<Invite>, AccessError> {
        let now = Utc::now();
        Ok(self
            .fetch_invites(organization_id)?
            .into_iter()
            .filter(|invite| invite.is_valid(now))
            .collect())
    }

    pub(crate) fn caller(&self) -> Result<Caller, AccessError> {
        let identity = self.session.current_identity().ok_or(AccessError::Unauthenticated)?;
        let role = self.backend().get_user_role(identity.user_id)?;
        let organization_id = self.backend().get_profile_organization_id(identity.user_id)?;
        Ok(Caller {
            identity,
            role,
            organization_id,
        })
    }

    fn super_admin_of(&self, organization_id: OrganizationId) -> Result<Caller, AccessError> {
        let caller = self.caller()?;
        caller.require_member_of(organization_id)?;
        if caller.role != Some(Role::SuperAdmin) {
            tracing::warn!(
                organization_id = %organization_id,
                user_id = %caller.user_id(),
                "member management denied"
            );
            return Err(AccessError::forbidden("only a super_admin can manage members"));
        }
        Ok(caller)
    }

    fn check_member_change(
        &self,
        organization_id: OrganizationId,
        target: UserId,
        change: MemberChange,
    ) -> Result<(), AccessError> {
        let members = self.backend().list_organization_members(organization_id)?;
        if !members.iter().any(|m| m.user_id == target) {
            return Err(AccessError::not_found(format!("member {target}")));
        }
        ensure_super_admin_remains(&members, target, change)?;
        Ok(())
    }

    pub(crate) fn refresh_session(&self) {
        if let Err(err) = self.session.refresh() {
            tracing::warn!(error = %err, "role refresh failed; session stays pending");
        }
    }

    pub(crate) fn refresh_logged(&self) {
        if let Err(err) = self.refresh() {
            tracing::warn!(error = %err, "organization refresh failed; membership stays pending");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MembershipCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MembershipCache> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}
