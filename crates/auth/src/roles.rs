//! Role catalog: the fixed role → permission table.
//!
//! Changing this table is a deployment event, not a runtime operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Permission;

/// Privilege level assigned to a user within one organization.
///
/// `Ord` follows privilege (agent < manager < admin < super_admin) and is meant
/// for display and sorting only. Authorization is always set membership via
/// [`Role::grants`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Agent,
    Manager,
    Admin,
    SuperAdmin,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

const SUPER_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ViewDashboard,
    Permission::ViewAgents,
    Permission::ManageAgents,
    Permission::ViewCampaigns,
    Permission::ManageCampaigns,
    Permission::ViewContacts,
    Permission::ManageContacts,
    Permission::ViewCalendar,
    Permission::ViewAnalytics,
    Permission::ViewSettings,
    Permission::ManageOrganization,
    Permission::ManageTeam,
    Permission::ManageIntegrations,
    Permission::ManageApiKeys,
    Permission::ManageBilling,
];

// Admin mirrors super_admin minus billing.
const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ViewDashboard,
    Permission::ViewAgents,
    Permission::ManageAgents,
    Permission::ViewCampaigns,
    Permission::ManageCampaigns,
    Permission::ViewContacts,
    Permission::ManageContacts,
    Permission::ViewCalendar,
    Permission::ViewAnalytics,
    Permission::ViewSettings,
    Permission::ManageOrganization,
    Permission::ManageTeam,
    Permission::ManageIntegrations,
    Permission::ManageApiKeys,
];

const MANAGER_PERMISSIONS: &[Permission] = &[
    Permission::ViewDashboard,
    Permission::ViewAgents,
    Permission::ViewCampaigns,
    Permission::ManageCampaigns,
    Permission::ViewContacts,
    Permission::ManageContacts,
    Permission::ViewCalendar,
    Permission::ViewAnalytics,
    Permission::ViewSettings,
];

const AGENT_PERMISSIONS: &[Permission] = &[
    Permission::ViewDashboard,
    Permission::ViewAgents,
    Permission::ViewCampaigns,
    Permission::ViewContacts,
    Permission::ViewCalendar,
    Permission::ViewSettings,
];

impl Role {
    /// Every role, most privileged first.
    pub const ALL: [Role; 4] = [Role::SuperAdmin, Role::Admin, Role::Manager, Role::Agent];

    /// Roles an invite may carry. `super_admin` is only ever granted to the
    /// founder of an organization or by another super_admin.
    pub const INVITABLE: [Role; 3] = [Role::Admin, Role::Manager, Role::Agent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Agent => "agent",
        }
    }

    /// Human-readable name used by badges and member lists.
    pub fn label(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "Super Admin",
            Role::Admin => "Admin",
            Role::Manager => "Manager",
            Role::Agent => "Agent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "Organization owner with every permission, including billing",
            Role::Admin => "Administrator with full access except billing",
            Role::Manager => "Runs campaigns and contacts; read access to agents and analytics",
            Role::Agent => "View-only access to day-to-day workspaces",
        }
    }

    pub fn is_invitable(&self) -> bool {
        Role::INVITABLE.contains(self)
    }

    /// Permissions granted by this role. Never empty.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Role::SuperAdmin => SUPER_ADMIN_PERMISSIONS,
            Role::Admin => ADMIN_PERMISSIONS,
            Role::Manager => MANAGER_PERMISSIONS,
            Role::Agent => AGENT_PERMISSIONS,
        }
    }

    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

/// Catalog lookup: the permissions a role grants.
pub fn permissions_for(role: Role) -> &'static [Permission] {
    role.permissions()
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn set(role: Role) -> HashSet<Permission> {
        permissions_for(role).iter().copied().collect()
    }

    #[test]
    fn every_role_grants_something() {
        for role in Role::ALL {
            assert!(!permissions_for(role).is_empty(), "{role} has no permissions");
        }
    }

    #[test]
    fn only_super_admin_manages_billing() {
        for role in Role::ALL {
            assert_eq!(
                role.grants(Permission::ManageBilling),
                role == Role::SuperAdmin,
                "billing grant for {role}"
            );
        }
    }

    #[test]
    fn roles_nest_except_billing() {
        let without_billing = |r: Role| {
            let mut s = set(r);
            s.remove(&Permission::ManageBilling);
            s
        };
        assert!(without_billing(Role::SuperAdmin).is_superset(&set(Role::Admin)));
        assert!(set(Role::Admin).is_superset(&set(Role::Manager)));
        assert!(set(Role::Manager).is_superset(&set(Role::Agent)));
        assert_eq!(without_billing(Role::SuperAdmin), set(Role::Admin));
    }

    #[test]
    fn tables_have_no_duplicates() {
        for role in Role::ALL {
            assert_eq!(set(role).len(), permissions_for(role).len(), "{role}");
        }
    }

    #[test]
    fn manager_and_agent_never_touch_team_or_organization() {
        for role in [Role::Manager, Role::Agent] {
            assert!(!role.grants(Permission::ManageTeam));
            assert!(!role.grants(Permission::ManageOrganization));
        }
        assert!(Role::Manager.grants(Permission::ViewAnalytics));
        assert!(!Role::Agent.grants(Permission::ViewAnalytics));
    }

    #[test]
    fn super_admin_is_not_invitable() {
        assert!(!Role::SuperAdmin.is_invitable());
        assert!(Role::INVITABLE.iter().all(Role::is_invitable));
    }

    #[test]
    fn ordering_follows_privilege() {
        let mut roles = vec![Role::Manager, Role::SuperAdmin, Role::Agent, Role::Admin];
        roles.sort();
        assert_eq!(roles, vec![Role::Agent, Role::Manager, Role::Admin, Role::SuperAdmin]);
    }

    #[test]
    fn parse_and_serde_agree() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            assert_eq!(serde_json::to_string(&role).unwrap(), format!("\"{role}\""));
        }
        assert!("owner".parse::<Role>().is_err());
    }
}
