//! Static navigation tables: which permission each route and settings section needs.

use crate::Permission;

/// Top-level application routes and the permission each one requires.
///
/// Anything not listed here is not gated by the permission engine.
pub const ROUTE_PERMISSIONS: &[(&str, Permission)] = &[
    ("/", Permission::ViewDashboard),
    ("/agents", Permission::ViewAgents),
    ("/campaigns", Permission::ViewCampaigns),
    ("/contacts", Permission::ViewContacts),
    ("/calendar", Permission::ViewCalendar),
    ("/analytics", Permission::ViewAnalytics),
    ("/settings", Permission::ViewSettings),
];

/// Settings sections (tabs) and the permission each one requires.
pub const SETTINGS_SECTION_PERMISSIONS: &[(&str, Permission)] = &[
    ("organization", Permission::ManageOrganization),
    ("team", Permission::ManageTeam),
    ("integrations", Permission::ManageIntegrations),
    ("api", Permission::ManageApiKeys),
    // Every member with settings access manages their own notifications.
    ("notifications", Permission::ViewSettings),
    ("billing", Permission::ManageBilling),
];

fn lookup(table: &[(&str, Permission)], key: &str) -> Option<Permission> {
    table.iter().find(|(k, _)| *k == key).map(|(_, p)| *p)
}

/// Permission required by `path`, if the route is gated.
pub fn route_permission(path: &str) -> Option<Permission> {
    lookup(ROUTE_PERMISSIONS, path)
}

/// Permission required by settings section `section_id`, if it is gated.
pub fn settings_section_permission(section_id: &str) -> Option<Permission> {
    lookup(SETTINGS_SECTION_PERMISSIONS, section_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_routes_resolve() {
        assert_eq!(route_permission("/"), Some(Permission::ViewDashboard));
        assert_eq!(route_permission("/analytics"), Some(Permission::ViewAnalytics));
        assert_eq!(route_permission("/settings"), Some(Permission::ViewSettings));
    }

    #[test]
    fn lookups_are_exact() {
        assert_eq!(route_permission("/campaigns/42"), None);
        assert_eq!(route_permission("/Campaigns"), None);
        assert_eq!(settings_section_permission("Billing"), None);
    }

    #[test]
    fn billing_section_needs_billing_permission() {
        assert_eq!(
            settings_section_permission("billing"),
            Some(Permission::ManageBilling)
        );
        assert_eq!(
            settings_section_permission("notifications"),
            Some(Permission::ViewSettings)
        );
    }

    #[test]
    fn tables_have_unique_keys() {
        for table in [ROUTE_PERMISSIONS, SETTINGS_SECTION_PERMISSIONS] {
            let mut keys: Vec<&str> = table.iter().map(|(k, _)| *k).collect();
            keys.sort_unstable();
            keys.dedup();
            assert_eq!(keys.len(), table.len());
        }
    }
}
