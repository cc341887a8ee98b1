use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capability token checked independently of role naming.
///
/// The set is closed: adding a permission is a code change, never a runtime
/// operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewDashboard,
    ViewAgents,
    ManageAgents,
    ViewCampaigns,
    ManageCampaigns,
    ViewContacts,
    ManageContacts,
    ViewCalendar,
    ViewAnalytics,
    ViewSettings,
    ManageOrganization,
    ManageTeam,
    ManageIntegrations,
    ManageApiKeys,
    ManageBilling,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown permission '{0}'")]
pub struct UnknownPermission(pub String);

impl Permission {
    /// Every permission, in declaration order.
    pub const ALL: [Permission; 15] = [
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

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewDashboard => "view_dashboard",
            Permission::ViewAgents => "view_agents",
            Permission::ManageAgents => "manage_agents",
            Permission::ViewCampaigns => "view_campaigns",
            Permission::ManageCampaigns => "manage_campaigns",
            Permission::ViewContacts => "view_contacts",
            Permission::ManageContacts => "manage_contacts",
            Permission::ViewCalendar => "view_calendar",
            Permission::ViewAnalytics => "view_analytics",
            Permission::ViewSettings => "view_settings",
            Permission::ManageOrganization => "manage_organization",
            Permission::ManageTeam => "manage_team",
            Permission::ManageIntegrations => "manage_integrations",
            Permission::ManageApiKeys => "manage_api_keys",
            Permission::ManageBilling => "manage_billing",
        }
    }

    /// Resource area the permission belongs to (for audit/display grouping).
    pub fn category(&self) -> &'static str {
        match self {
            Permission::ViewDashboard | Permission::ViewAnalytics => "insights",
            Permission::ViewAgents | Permission::ManageAgents => "agents",
            Permission::ViewCampaigns | Permission::ManageCampaigns => "campaigns",
            Permission::ViewContacts | Permission::ManageContacts => "contacts",
            Permission::ViewCalendar => "calendar",
            Permission::ViewSettings
            | Permission::ManageOrganization
            | Permission::ManageTeam
            | Permission::ManageIntegrations
            | Permission::ManageApiKeys
            | Permission::ManageBilling => "settings",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_serde() {
        for p in Permission::ALL {
            let json = serde_json::to_string(&p).unwrap();
            assert_eq!(json, format!("\"{}\"", p.as_str()));
            assert_eq!(p.as_str().parse::<Permission>().unwrap(), p);
        }
    }

    #[test]
    fn unknown_permission_is_rejected() {
        assert!("manage_everything".parse::<Permission>().is_err());
    }
}
