//! Access-control services over an external store.
//!
//! Session and organization caches, the invite lifecycle and the backend
//! contracts they consume, with in-memory implementations for tests/dev.

pub mod config;
pub mod error;
pub mod identity;
pub mod invites;
pub mod membership;
pub mod services;
pub mod session;
pub mod store;


pub use config::{AccessConfig, ConfigError};
pub use error::{AccessError, AuthError, BackendError};
pub use identity::{IdentityProvider, InMemoryIdentityProvider};
pub use invites::{AcceptedInvite, InviteLifecycle, TokenSource};
pub use membership::OrganizationMembership;
pub use services::AccessServices;
pub use session::{RoleResolution, SessionContext};
pub use store::{BackendOp, InMemoryBackend, OrganizationBackend};
