use std::sync::Arc;

use callgrid_auth::{AccessGate, GateDecision, Identity};

use crate::config::AccessConfig;
use crate::error::AuthError;
use crate::identity::IdentityProvider;
use crate::invites::InviteLifecycle;
use crate::membership::OrganizationMembership;
use crate::session::SessionContext;
use crate::store::OrganizationBackend;

/// One session's worth of access-control services, wired together.
///
/// Sign-in, sign-up and sign-out go through here so the organization cache is
/// re-resolved together with the role.
#[derive(Debug)]
pub struct AccessServices<B> {
    pub session: Arc<SessionContext<B>>,
    pub membership: Arc<OrganizationMembership<B>>,
    pub invites: InviteLifecycle<B>,
    pub gate: AccessGate,
}

impl<B> AccessServices<B>
where
    B: OrganizationBackend,
{
    pub fn new(config: AccessConfig, provider: Arc<dyn IdentityProvider>, backend: B) -> Self {
        let gate = config.gate();
        let session = Arc::new(SessionContext::new(provider, backend));
        let membership = Arc::new(OrganizationMembership::new(session.clone()));
        let invites = InviteLifecycle::new(membership.clone(), config);
        Self {
            session,
            membership,
            invites,
            gate,
        }
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = self.session.sign_in(email, password)?;
        self.membership.refresh_logged();
        Ok(identity)
    }

    pub fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Identity, AuthError> {
        let identity = self.session.sign_up(email, password, full_name)?;
        self.membership.refresh_logged();
        Ok(identity)
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        self.session.sign_out()?;
        self.membership.invalidate();
        Ok(())
    }

    pub fn restore(&self) -> Result<Option<Identity>, AuthError> {
        let identity = self.session.restore()?;
        if identity.is_some() {
            self.membership.refresh_logged();
        }
        Ok(identity)
    }

    pub fn decide(&self, path: &str) -> GateDecision {
        self.membership.decide(&self.gate, path)
    }

    pub fn decide_settings_section(&self, section_id: &str) -> GateDecision {
        self.membership.decide_settings_section(&self.gate, section_id)
    }
}
