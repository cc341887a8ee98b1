use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};

use callgrid_auth::{Identity, Role};
use callgrid_core::{EmailAddress, InviteId, OrganizationId, UserId};
use callgrid_org::{
    Invite, InviteToken, Member, MemberChange, NewOrganization, Organization, OrganizationPatch,
    ensure_super_admin_remains, unique_slug,
};

use super::r#trait::OrganizationBackend;
use crate::error::BackendError;

/// Backend operations that can be made to fail once, for tests.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BackendOp {
    EnsureProfile,
    GetProfileOrganization,
    GetOrganization,
    GetUserRole,
    ListMembers,
    InsertInvite,
    ListInvites,
    DeleteInvite,
    GetInviteByToken,
    AcceptInvite,
    CreateOrganization,
    UpdateOrganization,
    UpdateMemberRole,
    RemoveMember,
}

#[derive(Debug, Clone)]
struct Profile {
    email: EmailAddress,
    full_name: Option<String>,
    organization_id: Option<OrganizationId>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    profiles: HashMap<UserId, Profile>,
    roles: HashMap<UserId, Role>,
    organizations: HashMap<OrganizationId, Organization>,
    invites: HashMap<InviteId, Invite>,
    tokens: HashMap<InviteToken, InviteId>,
}

impl State {
    fn members_of(&self, organization_id: OrganizationId) -> Vec<Member> {
        let mut members: Vec<Member> = self
            .profiles
            .iter()
            .filter(|(_, p)| p.organization_id == Some(organization_id))
            .map(|(user_id, p)| Member {
                user_id: *user_id,
                full_name: p.full_name.clone(),
                email: p.email.clone(),
                role: self.roles.get(user_id).copied().unwrap_or(Role::Agent),
                created_at: p.created_at,
            })
            .collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.user_id.cmp(&b.user_id)));
        members
    }

    fn guard_owner(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        change: MemberChange,
    ) -> Result<(), BackendError> {
        let members = self.members_of(organization_id);
        if !members.iter().any(|m| m.user_id == user_id) {
            return Err(BackendError::NotFound(format!("member {user_id}")));
        }
        ensure_super_admin_remains(&members, user_id, change)
            .map_err(|e| BackendError::Constraint(e.to_string()))
    }
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// In-memory organization store.
///
/// Intended for tests/dev. Every write takes one lock over the whole state,
/// which makes the multi-row operations transactional.
#[derive(Default)]
pub struct InMemoryBackend {
    state: RwLock<State>,
    failures: Mutex<HashSet<BackendOp>>,
    fail_after_organization_insert: Mutex<bool>,
    role_lookup_hook: Mutex<Option<Hook>>,
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend").finish_non_exhaustive()
    }
}

fn poisoned<T>(_: T) -> BackendError {
    BackendError::Unavailable("lock poisoned".to_string())
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with [`BackendError::Unavailable`].
    pub fn fail_next(&self, op: BackendOp) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(op);
        }
    }

    /// Make the next organization creation fail after the organization row
    /// is written but before the founder is linked.
    pub fn fail_after_organization_insert(&self) {
        if let Ok(mut flag) = self.fail_after_organization_insert.lock() {
            *flag = true;
        }
    }

    /// Run `hook` at the start of every role lookup.
    pub fn on_role_lookup<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.role_lookup_hook.lock() {
            *slot = Some(Box::new(hook));
        }
    }

    /// Seed an invite as-is, bypassing issuance rules (e.g. already expired).
    pub fn seed_invite(&self, invite: Invite) -> Result<(), BackendError> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.tokens.insert(invite.token.clone(), invite.id);
        state.invites.insert(invite.id, invite);
        Ok(())
    }

    pub fn organization_count(&self) -> usize {
        self.state.read().map(|s| s.organizations.len()).unwrap_or(0)
    }

    fn check(&self, op: BackendOp) -> Result<(), BackendError> {
        let mut failures = self.failures.lock().map_err(poisoned)?;
        if failures.remove(&op) {
            return Err(BackendError::Unavailable(format!("injected failure: {op:?}")));
        }
        Ok(())
    }

    fn take_fail_after_insert(&self) -> bool {
        self.fail_after_organization_insert
            .lock()
            .map(|mut flag| std::mem::replace(&mut *flag, false))
            .unwrap_or(false)
    }
}

impl OrganizationBackend for InMemoryBackend {
    fn ensure_profile(&self, identity: &Identity) -> Result<(), BackendError> {
        self.check(BackendOp::EnsureProfile)?;
        let mut state = self.state.write().map_err(poisoned)?;
        if !state.profiles.contains_key(&identity.user_id) {
            state.profiles.insert(
                identity.user_id,
                Profile {
                    email: identity.email.clone(),
                    full_name: identity.full_name.clone(),
                    organization_id: None,
                    created_at: Utc::now(),
                },
            );
        }
        state.roles.entry(identity.user_id).or_insert(Role::Agent);
        Ok(())
    }

    fn get_profile_organization_id(&self, user_id: UserId) -> Result<Option<OrganizationId>, BackendError> {
        self.check(BackendOp::GetProfileOrganization)?;
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.profiles.get(&user_id).and_then(|p| p.organization_id))
    }

    fn get_organization(&self, organization_id: OrganizationId) -> Result<Option<Organization>, BackendError> {
        self.check(BackendOp::GetOrganization)?;
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.organizations.get(&organization_id).cloned())
    }

    fn get_user_role(&self, user_id: UserId) -> Result<Option<Role>, BackendError> {
        if let Ok(hook) = self.role_lookup_hook.lock() {
            if let Some(hook) = hook.as_ref() {
                hook();
            }
        }
        self.check(BackendOp::GetUserRole)?;
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.roles.get(&user_id).copied())
    }

    fn list_organization_members(&self, organization_id: OrganizationId) -> Result<Vec<Member>, BackendError> {
        self.check(BackendOp::ListMembers)?;
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.members_of(organization_id))
    }

    fn insert_invite(&self, invite: Invite) -> Result<(), BackendError> {
        self.check(BackendOp::InsertInvite)?;
        let mut state = self.state.write().map_err(poisoned)?;
        if state.tokens.contains_key(&invite.token) {
            return Err(BackendError::DuplicateToken);
        }
        if !state.organizations.contains_key(&invite.organization_id) {
            return Err(BackendError::NotFound(format!("organization {}", invite.organization_id)));
        }
        let is_member = state
            .members_of(invite.organization_id)
            .iter()
            .any(|m| m.email == invite.email);
        if is_member {
            return Err(BackendError::Constraint(format!("{} is already a member", invite.email)));
        }
        let has_pending = state.invites.values().any(|other| {
            other.organization_id == invite.organization_id
                && other.email == invite.email
                && other.is_valid(invite.created_at)
        });
        if has_pending {
            return Err(BackendError::Constraint(format!(
                "{} already has a pending invite",
                invite.email
            )));
        }
        state.tokens.insert(invite.token.clone(), invite.id);
        state.invites.insert(invite.id, invite);
        Ok(())
    }

    fn list_invites(&self, organization_id: OrganizationId) -> Result<Vec<Invite>, BackendError> {
        self.check(BackendOp::ListInvites)?;
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .invites
            .values()
            .filter(|i| i.organization_id == organization_id)
            .cloned()
            .collect())
    }

    fn delete_invite(&self, organization_id: OrganizationId, invite_id: InviteId) -> Result<bool, BackendError> {
        self.check(BackendOp::DeleteInvite)?;
        let mut state = self.state.write().map_err(poisoned)?;
        let Some(existing) = state
            .invites
            .get(&invite_id)
            .filter(|i| i.organization_id == organization_id)
        else {
            return Ok(false);
        };
        if existing.accepted_at.is_some() {
            return Err(BackendError::AlreadyAccepted);
        }
        if let Some(invite) = state.invites.remove(&invite_id) {
            state.tokens.remove(&invite.token);
        }
        Ok(true)
    }

    fn get_invite_by_token(&self, token: &InviteToken) -> Result<Option<Invite>, BackendError> {
        self.check(BackendOp::GetInviteByToken)?;
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .tokens
            .get(token)
            .and_then(|id| state.invites.get(id))
            .cloned())
    }

    fn transactionally_accept_invite(
        &self,
        token: &InviteToken,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, BackendError> {
        self.check(BackendOp::AcceptInvite)?;
        let mut state = self.state.write().map_err(poisoned)?;

        let Some(invite_id) = state.tokens.get(token).copied() else {
            return Ok(false);
        };
        let Some(invite) = state.invites.get(&invite_id).cloned() else {
            return Ok(false);
        };
        if !invite.is_valid(now) {
            return Ok(false);
        }
        let Some(profile) = state.profiles.get(&user_id) else {
            return Err(BackendError::NotFound(format!("profile {user_id}")));
        };
        if profile.organization_id.is_some() {
            return Err(BackendError::AlreadyInOrganization);
        }

        if let Some(stored) = state.invites.get_mut(&invite_id) {
            stored.accepted_at = Some(now);
        }
        if let Some(profile) = state.profiles.get_mut(&user_id) {
            profile.organization_id = Some(invite.organization_id);
        }
        state.roles.insert(user_id, invite.role);
        Ok(true)
    }

    fn create_organization_with_founding_admin(
        &self,
        organization: &NewOrganization,
        founder: UserId,
        now: DateTime<Utc>,
    ) -> Result<OrganizationId, BackendError> {
        self.check(BackendOp::CreateOrganization)?;
        let mut state = self.state.write().map_err(poisoned)?;

        match state.profiles.get(&founder) {
            None => return Err(BackendError::NotFound(format!("profile {founder}"))),
            Some(p) if p.organization_id.is_some() => return Err(BackendError::AlreadyInOrganization),
            Some(_) => {}
        }

        let slug = {
            let taken: HashSet<&str> = state.organizations.values().map(|o| o.slug.as_str()).collect();
            unique_slug(&organization.base_slug, |candidate| taken.contains(candidate))
        };
        let id = OrganizationId::new();
        state.organizations.insert(
            id,
            Organization {
                id,
                name: organization.name.clone(),
                slug,
                industry: organization.industry.clone(),
                website: organization.website.clone(),
                logo_url: None,
                created_at: now,
            },
        );

        if self.take_fail_after_insert() {
            state.organizations.remove(&id);
            return Err(BackendError::Unavailable("injected failure after organization insert".to_string()));
        }

        if let Some(profile) = state.profiles.get_mut(&founder) {
            profile.organization_id = Some(id);
        }
        state.roles.insert(founder, Role::SuperAdmin);
        Ok(id)
    }

    fn update_organization(
        &self,
        organization_id: OrganizationId,
        patch: &OrganizationPatch,
    ) -> Result<Organization, BackendError> {
        self.check(BackendOp::UpdateOrganization)?;
        let mut state = self.state.write().map_err(poisoned)?;
        let Some(current) = state.organizations.get(&organization_id) else {
            return Err(BackendError::NotFound(format!("organization {organization_id}")));
        };
        let updated = patch.apply_to(current);
        state.organizations.insert(organization_id, updated.clone());
        Ok(updated)
    }

    fn update_member_role(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: Role,
    ) -> Result<(), BackendError> {
        self.check(BackendOp::UpdateMemberRole)?;
        let mut state = self.state.write().map_err(poisoned)?;
        state.guard_owner(organization_id, user_id, MemberChange::SetRole(role))?;
        state.roles.insert(user_id, role);
        Ok(())
    }

    fn remove_member(&self, organization_id: OrganizationId, user_id: UserId) -> Result<(), BackendError> {
        self.check(BackendOp::RemoveMember)?;
        let mut state = self.state.write().map_err(poisoned)?;
        state.guard_owner(organization_id, user_id, MemberChange::Remove)?;
        if let Some(profile) = state.profiles.get_mut(&user_id) {
            profile.organization_id = None;
        }
        state.roles.insert(user_id, Role::Agent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn identity(email: &str) -> Identity {
        Identity::new(UserId::new(), EmailAddress::parse(email).unwrap())
    }

    fn founded(backend: &InMemoryBackend, email: &str, name: &str) -> (Identity, OrganizationId) {
        let founder = identity(email);
        backend.ensure_profile(&founder).unwrap();
        let org = NewOrganization::new(name, None, None).unwrap();
        let id = backend
            .create_organization_with_founding_admin(&org, founder.user_id, Utc::now())
            .unwrap();
        (founder, id)
    }

    fn pending_invite(org: OrganizationId, by: UserId, email: &str) -> Invite {
        let request = callgrid_org::InviteRequest {
            organization_id: org,
            email: email.to_string(),
            role: Role::Manager,
            created_by: by,
            ttl: Duration::days(7),
        };
        Invite::issue(&request, Utc::now()).unwrap()
    }

    #[test]
    fn ensure_profile_defaults_to_agent_without_org() {
        let backend = InMemoryBackend::new();
        let user = identity("new@acme.io");
        backend.ensure_profile(&user).unwrap();
        backend.ensure_profile(&user).unwrap();

        assert_eq!(backend.get_user_role(user.user_id).unwrap(), Some(Role::Agent));
        assert_eq!(backend.get_profile_organization_id(user.user_id).unwrap(), None);
    }

    #[test]
    fn founding_grants_super_admin_and_unique_slugs() {
        let backend = InMemoryBackend::new();
        let (first, a) = founded(&backend, "one@acme.io", "Acme");
        let (_, b) = founded(&backend, "two@acme.io", "Acme");

        assert_eq!(backend.get_user_role(first.user_id).unwrap(), Some(Role::SuperAdmin));
        assert_eq!(backend.get_organization(a).unwrap().unwrap().slug, "acme");
        assert_eq!(backend.get_organization(b).unwrap().unwrap().slug, "acme-2");
    }

    #[test]
    fn failed_founding_leaves_nothing_behind() {
        let backend = InMemoryBackend::new();
        let founder = identity("one@acme.io");
        backend.ensure_profile(&founder).unwrap();
        backend.fail_after_organization_insert();

        let org = NewOrganization::new("Acme", None, None).unwrap();
        let err = backend
            .create_organization_with_founding_admin(&org, founder.user_id, Utc::now())
            .unwrap_err();

        assert!(matches!(err, BackendError::Unavailable(_)));
        assert_eq!(backend.organization_count(), 0);
        assert_eq!(backend.get_user_role(founder.user_id).unwrap(), Some(Role::Agent));
        assert_eq!(backend.get_profile_organization_id(founder.user_id).unwrap(), None);
    }

    #[test]
    fn duplicate_token_is_rejected_not_overwritten() {
        let backend = InMemoryBackend::new();
        let (founder, org) = founded(&backend, "one@acme.io", "Acme");
        let first = pending_invite(org, founder.user_id, "a@acme.io");
        let mut second = pending_invite(org, founder.user_id, "b@acme.io");
        second.token = first.token.clone();

        backend.insert_invite(first.clone()).unwrap();
        assert_eq!(backend.insert_invite(second), Err(BackendError::DuplicateToken));

        let stored = backend.get_invite_by_token(&first.token).unwrap().unwrap();
        assert_eq!(stored.email, "a@acme.io");
    }

    #[test]
    fn second_open_invite_for_an_address_is_refused() {
        let backend = InMemoryBackend::new();
        let (founder, org) = founded(&backend, "one@acme.io", "Acme");
        backend.insert_invite(pending_invite(org, founder.user_id, "a@acme.io")).unwrap();

        assert!(matches!(
            backend.insert_invite(pending_invite(org, founder.user_id, "A@acme.io")),
            Err(BackendError::Constraint(_))
        ));
        assert!(matches!(
            backend.insert_invite(pending_invite(org, founder.user_id, "one@acme.io")),
            Err(BackendError::Constraint(_))
        ));
        assert_eq!(backend.list_invites(org).unwrap().len(), 1);
    }

    #[test]
    fn expired_invite_does_not_block_a_new_one() {
        let backend = InMemoryBackend::new();
        let (founder, org) = founded(&backend, "one@acme.io", "Acme");
        let mut stale = pending_invite(org, founder.user_id, "a@acme.io");
        stale.expires_at = Utc::now() - Duration::days(1);
        backend.seed_invite(stale).unwrap();

        backend.insert_invite(pending_invite(org, founder.user_id, "a@acme.io")).unwrap();
        assert_eq!(backend.list_invites(org).unwrap().len(), 2);
    }

    #[test]
    fn accepted_invite_is_not_deleted() {
        let backend = InMemoryBackend::new();
        let (founder, org) = founded(&backend, "one@acme.io", "Acme");
        let invite = pending_invite(org, founder.user_id, "a@acme.io");
        backend.insert_invite(invite.clone()).unwrap();
        let invitee = identity("a@acme.io");
        backend.ensure_profile(&invitee).unwrap();
        backend
            .transactionally_accept_invite(&invite.token, invitee.user_id, Utc::now())
            .unwrap();

        assert_eq!(backend.delete_invite(org, invite.id), Err(BackendError::AlreadyAccepted));
        assert!(backend.get_invite_by_token(&invite.token).unwrap().is_some());
    }

    #[test]
    fn acceptance_happens_once() {
        let backend = InMemoryBackend::new();
        let (founder, org) = founded(&backend, "one@acme.io", "Acme");
        let invite = pending_invite(org, founder.user_id, "a@acme.io");
        backend.insert_invite(invite.clone()).unwrap();

        let invitee = identity("a@acme.io");
        backend.ensure_profile(&invitee).unwrap();

        assert!(backend
            .transactionally_accept_invite(&invite.token, invitee.user_id, Utc::now())
            .unwrap());
        assert!(!backend
            .transactionally_accept_invite(&invite.token, invitee.user_id, Utc::now())
            .unwrap());
        assert_eq!(backend.get_user_role(invitee.user_id).unwrap(), Some(Role::Manager));
        assert_eq!(backend.list_organization_members(org).unwrap().len(), 2);
    }

    #[test]
    fn last_super_admin_cannot_leave() {
        let backend = InMemoryBackend::new();
        let (founder, org) = founded(&backend, "one@acme.io", "Acme");

        assert!(matches!(
            backend.update_member_role(org, founder.user_id, Role::Admin),
            Err(BackendError::Constraint(_))
        ));
        assert!(matches!(
            backend.remove_member(org, founder.user_id),
            Err(BackendError::Constraint(_))
        ));
    }

    #[test]
    fn writes_are_scoped_to_the_organization() {
        let backend = InMemoryBackend::new();
        let (founder_a, org_a) = founded(&backend, "one@acme.io", "Acme");
        let (_, org_b) = founded(&backend, "two@globex.io", "Globex");

        let invite = pending_invite(org_a, founder_a.user_id, "a@acme.io");
        backend.insert_invite(invite.clone()).unwrap();

        assert!(!backend.delete_invite(org_b, invite.id).unwrap());
        assert!(backend.list_invites(org_b).unwrap().is_empty());
        assert!(matches!(
            backend.update_member_role(org_b, founder_a.user_id, Role::Agent),
            Err(BackendError::NotFound(_))
        ));
    }

    #[test]
    fn injected_failure_fires_once() {
        let backend = InMemoryBackend::new();
        let user = identity("x@acme.io");
        backend.ensure_profile(&user).unwrap();
        backend.fail_next(BackendOp::GetUserRole);

        assert!(matches!(backend.get_user_role(user.user_id), Err(BackendError::Unavailable(_))));
        assert_eq!(backend.get_user_role(user.user_id).unwrap(), Some(Role::Agent));
    }

    mod props {
        use proptest::prelude::*;

        use super::*;

        fn change() -> impl Strategy<Value = (usize, Option<Role>)> {
            (0usize..4, proptest::option::of(proptest::sample::select(Role::ALL.to_vec())))
        }

        proptest! {
            #[test]
            fn organization_never_loses_its_last_super_admin(
                changes in proptest::collection::vec(change(), 1..24)
            ) {
                let backend = InMemoryBackend::new();
                let (founder, org) = founded(&backend, "owner@acme.io", "Acme");
                let mut users = vec![founder.user_id];
                for n in 0..3 {
                    let email = format!("member{n}@acme.io");
                    let invite = pending_invite(org, founder.user_id, &email);
                    backend.insert_invite(invite.clone()).unwrap();
                    let member = identity(&email);
                    backend.ensure_profile(&member).unwrap();
                    backend.transactionally_accept_invite(&invite.token, member.user_id, Utc::now()).unwrap();
                    users.push(member.user_id);
                }

                for (index, role) in changes {
                    let user = users[index];
                    let _ = match role {
                        Some(role) => backend.update_member_role(org, user, role),
                        None => backend.remove_member(org, user),
                    };
                    let owners = backend
                        .list_organization_members(org)
                        .unwrap()
                        .iter()
                        .filter(|m| m.role == Role::SuperAdmin)
                        .count();
                    prop_assert!(owners >= 1);
                }
            }
        }
    }
}
