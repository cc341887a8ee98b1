//! Navigation gate: one allow/redirect/pending decision per navigation attempt.
//!
//! The check order is fixed:
//!
//! ```text
//! identity missing            -> redirect to login
//! role or membership pending  -> pending (caller holds rendering)
//! no organization             -> redirect to onboarding (unless already there)
//! route needs a permission    -> redirect home when the role lacks it
//! otherwise                   -> allow
//! ```
//!
//! Onboarding is checked before permissions so that a user without an
//! organization never reaches a gated page, whatever role they will end up with.

use serde::{Deserialize, Serialize};

use crate::authorize::has_permission;
use crate::navigation::{route_permission, settings_section_permission};
use crate::{Identity, Role};

/// Whether the current identity belongs to an organization.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganizationStatus {
    /// Resolution has not completed (or failed and must be retried).
    Unresolved,
    Absent,
    Present,
}

impl OrganizationStatus {
    pub fn from_flag(has_organization: Option<bool>) -> Self {
        match has_organization {
            None => OrganizationStatus::Unresolved,
            Some(false) => OrganizationStatus::Absent,
            Some(true) => OrganizationStatus::Present,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            OrganizationStatus::Unresolved => None,
            OrganizationStatus::Absent => Some(false),
            OrganizationStatus::Present => Some(true),
        }
    }
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "target", rename_all = "snake_case")]
pub enum GateDecision {
    Allow,
    /// Not enough information yet; render a loading state, never a page.
    Pending,
    RedirectTo(String),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// Well-known paths the gate redirects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePaths {
    pub login: String,
    pub onboarding: String,
    pub home: String,
    pub settings: String,
}

impl Default for GatePaths {
    fn default() -> Self {
        Self {
            login: "/auth".to_string(),
            onboarding: "/onboarding".to_string(),
            home: "/".to_string(),
            settings: "/settings".to_string(),
        }
    }
}

/// Pure composition of identity, role, membership and the permission engine.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    paths: GatePaths,
}

impl AccessGate {
    pub fn new(paths: GatePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &GatePaths {
        &self.paths
    }

    /// Decide a navigation attempt to `requested_path`.
    pub fn decide(
        &self,
        identity: Option<&Identity>,
        role: Option<Role>,
        organization: OrganizationStatus,
        requested_path: &str,
    ) -> GateDecision {
        let role = match self.precheck(identity, role, organization, requested_path) {
            Ok(role) => role,
            Err(decision) => return decision,
        };

        match route_permission(requested_path) {
            Some(required) if !has_permission(Some(role), required) => {
                tracing::debug!(path = requested_path, %role, %required, "route denied");
                GateDecision::RedirectTo(self.paths.home.clone())
            }
            _ => GateDecision::Allow,
        }
    }

    /// Decide opening settings section `section_id`.
    ///
    /// The settings route itself must be reachable; a section the role cannot
    /// open falls back to the settings landing page.
    pub fn decide_settings_section(
        &self,
        identity: Option<&Identity>,
        role: Option<Role>,
        organization: OrganizationStatus,
        section_id: &str,
    ) -> GateDecision {
        let route = self.decide(identity, role, organization, &self.paths.settings);
        if !route.is_allowed() {
            return route;
        }

        match settings_section_permission(section_id) {
            Some(required) if !has_permission(role, required) => {
                tracing::debug!(section = section_id, %required, "settings section denied");
                GateDecision::RedirectTo(self.paths.settings.clone())
            }
            _ => GateDecision::Allow,
        }
    }

    fn precheck(
        &self,
        identity: Option<&Identity>,
        role: Option<Role>,
        organization: OrganizationStatus,
        requested_path: &str,
    ) -> Result<Role, GateDecision> {
        if identity.is_none() {
            return Err(GateDecision::RedirectTo(self.paths.login.clone()));
        }

        let role = match (organization, role) {
            (OrganizationStatus::Unresolved, _) | (_, None) => return Err(GateDecision::Pending),
            (_, Some(role)) => role,
        };

        if organization == OrganizationStatus::Absent && requested_path != self.paths.onboarding {
            return Err(GateDecision::RedirectTo(self.paths.onboarding.clone()));
        }

        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use callgrid_core::{EmailAddress, UserId};

    use super::*;

    fn identity() -> Identity {
        Identity::new(UserId::new(), EmailAddress::parse("founder@acme.io").unwrap())
    }

    fn redirect(path: &str) -> GateDecision {
        GateDecision::RedirectTo(path.to_string())
    }

    #[test]
    fn anonymous_goes_to_login() {
        let gate = AccessGate::default();
        for status in [
            OrganizationStatus::Unresolved,
            OrganizationStatus::Absent,
            OrganizationStatus::Present,
        ] {
            assert_eq!(gate.decide(None, Some(Role::SuperAdmin), status, "/"), redirect("/auth"));
        }
    }

    #[test]
    fn unresolved_session_is_pending() {
        let gate = AccessGate::default();
        let id = identity();
        assert_eq!(
            gate.decide(Some(&id), None, OrganizationStatus::Unresolved, "/"),
            GateDecision::Pending
        );
        assert_eq!(
            gate.decide(Some(&id), Some(Role::Agent), OrganizationStatus::Unresolved, "/"),
            GateDecision::Pending
        );
        assert_eq!(
            gate.decide(Some(&id), None, OrganizationStatus::Present, "/analytics"),
            GateDecision::Pending
        );
    }

    #[test]
    fn onboarding_redirect_precedes_permission_check() {
        let gate = AccessGate::default();
        let id = identity();
        assert_eq!(
            gate.decide(Some(&id), Some(Role::Agent), OrganizationStatus::Absent, "/campaigns"),
            redirect("/onboarding")
        );
        // An agent could never open analytics, but onboarding still wins.
        assert_eq!(
            gate.decide(Some(&id), Some(Role::Agent), OrganizationStatus::Absent, "/analytics"),
            redirect("/onboarding")
        );
        assert_eq!(
            gate.decide(Some(&id), Some(Role::Agent), OrganizationStatus::Absent, "/onboarding"),
            GateDecision::Allow
        );
    }

    #[test]
    fn missing_permission_redirects_home() {
        let gate = AccessGate::default();
        let id = identity();
        assert_eq!(
            gate.decide(Some(&id), Some(Role::Agent), OrganizationStatus::Present, "/analytics"),
            redirect("/")
        );
        assert_eq!(
            gate.decide(Some(&id), Some(Role::Manager), OrganizationStatus::Present, "/analytics"),
            GateDecision::Allow
        );
        assert_eq!(
            gate.decide(Some(&id), Some(Role::Agent), OrganizationStatus::Present, "/unknown"),
            GateDecision::Allow
        );
    }

    #[test]
    fn custom_paths_are_honored() {
        let gate = AccessGate::new(GatePaths {
            login: "/login".into(),
            onboarding: "/welcome".into(),
            home: "/dashboard".into(),
            settings: "/settings".into(),
        });
        let id = identity();
        assert_eq!(gate.decide(None, None, OrganizationStatus::Unresolved, "/"), redirect("/login"));
        assert_eq!(
            gate.decide(Some(&id), Some(Role::Agent), OrganizationStatus::Absent, "/"),
            redirect("/welcome")
        );
        assert_eq!(
            gate.decide(Some(&id), Some(Role::Agent), OrganizationStatus::Present, "/analytics"),
            redirect("/dashboard")
        );
    }

    #[test]
    fn settings_sections_fall_back_to_settings() {
        let gate = AccessGate::default();
        let id = identity();
        assert_eq!(
            gate.decide_settings_section(
                Some(&id),
                Some(Role::Admin),
                OrganizationStatus::Present,
                "billing"
            ),
            redirect("/settings")
        );
        assert_eq!(
            gate.decide_settings_section(
                Some(&id),
                Some(Role::Agent),
                OrganizationStatus::Present,
                "notifications"
            ),
            GateDecision::Allow
        );
        assert_eq!(
            gate.decide_settings_section(Some(&id), None, OrganizationStatus::Present, "team"),
            GateDecision::Pending
        );
        assert_eq!(
            gate.decide_settings_section(
                Some(&id),
                Some(Role::Admin),
                OrganizationStatus::Absent,
                "team"
            ),
            redirect("/onboarding")
        );
    }

    #[test]
    fn status_flag_round_trip() {
        for flag in [None, Some(false), Some(true)] {
            assert_eq!(OrganizationStatus::from_flag(flag).as_flag(), flag);
        }
    }
}
