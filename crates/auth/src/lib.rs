//! `callgrid-auth` — pure authorization policy for the dashboard.
//!
//! Role catalog, permission engine, navigation tables and the access gate.
//! This crate is intentionally decoupled from storage and transport.

pub mod authorize;
pub mod gate;
pub mod navigation;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthorizationExplanation, AuthzError, RbacRegistry, accessible_routes,
    accessible_settings_sections, authorize, can_access_route, can_access_settings_section,
    explain_authorization, filter_accessible, has_permission,
};
pub use gate::{AccessGate, GateDecision, GatePaths, OrganizationStatus};
pub use permissions::{Permission, UnknownPermission};
pub use principal::Identity;
pub use roles::{Role, UnknownRole, permissions_for};
