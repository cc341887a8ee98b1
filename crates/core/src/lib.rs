//! `callgrid-core` — shared primitives for the organization access-control core.
//!
//! This crate contains **pure** building blocks (no storage, no transport).

pub mod error;
pub mod id;
pub mod value_object;

pub use error::{DomainError, DomainResult};
pub use id::{InviteId, OrganizationId, UserId};
pub use value_object::{EmailAddress, ValueObject};
