//! Permission engine: pure answers to "may role R do P / open route X".
//!
//! - No IO
//! - No panics
//! - Fail-closed when the role is unknown (`None`)

use serde::Serialize;
use thiserror::Error;

use crate::navigation::{route_permission, settings_section_permission};
use crate::{Permission, Role};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthzError {
    #[error("role not resolved")]
    Unresolved,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),
}

/// `true` when `role` grants `permission`. An unresolved role grants nothing.
pub fn has_permission(role: Option<Role>, permission: Permission) -> bool {
    role.is_some_and(|r| r.grants(permission))
}

/// `Result` flavour of [`has_permission`] for command boundaries.
pub fn authorize(role: Option<Role>, required: Permission) -> Result<(), AuthzError> {
    match role {
        None => Err(AuthzError::Unresolved),
        Some(r) if r.grants(required) => Ok(()),
        Some(_) => Err(AuthzError::Forbidden(required)),
    }
}

/// Routes without a table entry are allowed; whatever handles them (usually a
/// 404 page) owns their access control.
pub fn can_access_route(role: Option<Role>, path: &str) -> bool {
    match route_permission(path) {
        Some(permission) => has_permission(role, permission),
        None => true,
    }
}

/// Same default-allow rule as [`can_access_route`], over settings sections.
pub fn can_access_settings_section(role: Option<Role>, section_id: &str) -> bool {
    match settings_section_permission(section_id) {
        Some(permission) => has_permission(role, permission),
        None => true,
    }
}

/// Keep the items whose required permission (if any) is granted to `role`.
///
/// Stable: surviving items keep their input order.
pub fn filter_accessible<T, F>(
    role: Option<Role>,
    items: impl IntoIterator<Item = T>,
    required: F,
) -> Vec<T>
where
    F: Fn(&T) -> Option<Permission>,
{
    items
        .into_iter()
        .filter(|item| required(item).is_none_or(|p| has_permission(role, p)))
        .collect()
}

/// Navigation entries `role` may see, keyed by their route path.
pub fn accessible_routes<T, F>(role: Option<Role>, items: impl IntoIterator<Item = T>, href: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    filter_accessible(role, items, |item| route_permission(href(item)))
}

/// Settings tabs `role` may see, keyed by their section id.
pub fn accessible_settings_sections<T, F>(
    role: Option<Role>,
    items: impl IntoIterator<Item = T>,
    section_id: F,
) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    filter_accessible(role, items, |item| settings_section_permission(section_id(item)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: Permission,
    pub granted: bool,
    pub reason: String,
    pub role: Option<Role>,
    pub effective_permissions: Vec<Permission>,
    pub denial_reason: Option<DenialReason>,
}

/// Why a check was denied and what would fix it.
#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    /// Roles that would grant the permission, most privileged first.
    pub granting_roles: Vec<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    RoleUnresolved,
    MissingPermission,
}

/// Explain why [`has_permission`] answers the way it does for `role`.
pub fn explain_authorization(role: Option<Role>, required: Permission) -> AuthorizationExplanation {
    let granting_roles: Vec<Role> = Role::ALL.into_iter().filter(|r| r.grants(required)).collect();

    let Some(role) = role else {
        return AuthorizationExplanation {
            required_permission: required,
            granted: false,
            reason: "No role is resolved for the current session".to_string(),
            role: None,
            effective_permissions: Vec::new(),
            denial_reason: Some(DenialReason {
                kind: DenialKind::RoleUnresolved,
                message: "Role resolution has not completed; every check fails closed".to_string(),
                granting_roles,
            }),
        };
    };

    let effective_permissions = role.permissions().to_vec();

    if role.grants(required) {
        AuthorizationExplanation {
            required_permission: required,
            granted: true,
            reason: format!("Role '{role}' grants '{required}'"),
            role: Some(role),
            effective_permissions,
            denial_reason: None,
        }
    } else {
        AuthorizationExplanation {
            required_permission: required,
            granted: false,
            reason: format!("Role '{role}' does not grant '{required}'"),
            role: Some(role),
            effective_permissions,
            denial_reason: Some(DenialReason {
                kind: DenialKind::MissingPermission,
                message: format!("Missing required permission: '{required}'"),
                granting_roles,
            }),
        }
    }
}

/// Role definition with its granted permissions (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub role: Role,
    pub label: &'static str,
    pub description: &'static str,
    pub permissions: Vec<Permission>,
}

/// Permission definition (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct PermissionDefinition {
    pub permission: Permission,
    pub category: &'static str,
    pub granted_by: Vec<Role>,
}

/// Complete view of the role catalog, most privileged role first.
#[derive(Debug, Clone, Serialize)]
pub struct RbacRegistry {
    pub roles: Vec<RoleDefinition>,
    pub permissions: Vec<PermissionDefinition>,
}

impl RbacRegistry {
    pub fn new() -> Self {
        let roles = Role::ALL
            .into_iter()
            .map(|role| RoleDefinition {
                role,
                label: role.label(),
                description: role.description(),
                permissions: role.permissions().to_vec(),
            })
            .collect();

        let permissions = Permission::ALL
            .into_iter()
            .map(|permission| PermissionDefinition {
                permission,
                category: permission.category(),
                granted_by: Role::ALL.into_iter().filter(|r| r.grants(permission)).collect(),
            })
            .collect();

        Self { roles, permissions }
    }

    pub fn role(&self, role: Role) -> Option<&RoleDefinition> {
        self.roles.iter().find(|d| d.role == role)
    }
}

impl Default for RbacRegistry {
    fn default() -> Self {
        Self::new()
    }
}
