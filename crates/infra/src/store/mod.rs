//! Organization store boundary.
//!
//! The access-control core never implements persistence. This module defines
//! the operations a storage/identity backend must provide, plus an in-memory
//! implementation for tests and local development.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{BackendOp, InMemoryBackend};
pub use r#trait::OrganizationBackend;
