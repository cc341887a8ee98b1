//! Organization members and the "never orphan an organization" guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use callgrid_auth::Role;
use callgrid_core::{DomainError, DomainResult, EmailAddress, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    pub full_name: Option<String>,
    pub email: EmailAddress,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Change requested for one member.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemberChange {
    SetRole(Role),
    Remove,
}

/// Check that applying `change` to `target` keeps at least one super_admin.
///
/// Also fails when `target` is not in `members`.
pub fn ensure_super_admin_remains(
    members: &[Member],
    target: UserId,
    change: MemberChange,
) -> DomainResult<()> {
    let Some(member) = members.iter().find(|m| m.user_id == target) else {
        return Err(DomainError::invariant("target is not a member of the organization"));
    };

    let loses_super_admin = member.role == Role::SuperAdmin
        && match change {
            MemberChange::SetRole(role) => role != Role::SuperAdmin,
            MemberChange::Remove => true,
        };

    let super_admins = members.iter().filter(|m| m.role == Role::SuperAdmin).count();
    if loses_super_admin && super_admins <= 1 {
        return Err(DomainError::invariant(
            "organization must keep at least one super_admin",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(role: Role) -> Member {
        Member {
            user_id: UserId::new(),
            full_name: None,
            email: EmailAddress::parse(&format!("{}@acme.io", role.as_str().replace('_', "")))
                .unwrap(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn last_super_admin_cannot_step_down_or_leave() {
        let owner = member(Role::SuperAdmin);
        let members = vec![owner.clone(), member(Role::Admin)];
        assert!(
            ensure_super_admin_remains(&members, owner.user_id, MemberChange::SetRole(Role::Admin))
                .is_err()
        );
        assert!(ensure_super_admin_remains(&members, owner.user_id, MemberChange::Remove).is_err());
        assert!(
            ensure_super_admin_remains(
                &members,
                owner.user_id,
                MemberChange::SetRole(Role::SuperAdmin)
            )
            .is_ok()
        );
    }

    #[test]
    fn second_super_admin_unlocks_demotion() {
        let owner = member(Role::SuperAdmin);
        let co_owner = member(Role::SuperAdmin);
        let members = vec![owner.clone(), co_owner];
        assert!(ensure_super_admin_remains(&members, owner.user_id, MemberChange::Remove).is_ok());
    }

    #[test]
    fn other_members_are_unrestricted() {
        let owner = member(Role::SuperAdmin);
        let agent = member(Role::Agent);
        let members = vec![owner, agent.clone()];
        assert!(ensure_super_admin_remains(&members, agent.user_id, MemberChange::Remove).is_ok());
    }

    #[test]
    fn unknown_target_is_rejected() {
        let members = vec![member(Role::SuperAdmin)];
        assert!(ensure_super_admin_remains(&members, UserId::new(), MemberChange::Remove).is_err());
    }
}
