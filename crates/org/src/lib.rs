//! Organizations, members and the invite state machine.
//!
//! Pure domain code: no storage, no clocks (callers pass `now`).

pub mod invite;
pub mod member;
pub mod organization;
pub mod slug;
pub mod token;

pub use invite::{
    DEFAULT_INVITE_TTL_DAYS, Invite, InviteDetails, InviteRequest, InviteState,
    MAX_INVITE_TTL_DAYS, default_invite_ttl, invite_link,
};
pub use member::{Member, MemberChange, ensure_super_admin_remains};
pub use organization::{NewOrganization, Organization, OrganizationPatch, OrganizationState};
pub use slug::{slugify, unique_slug};
pub use token::InviteToken;
