//! Data access layer (Repository pattern)
//!
//! The guard consumes two stores: memberships and external store mappings.
//! Both are injected as traits so tests can substitute in-memory fakes.

pub mod membership;
pub mod store_mapping;

pub use membership::{MembershipRepository, MembershipRepositoryImpl};
pub use store_mapping::{StoreMappingRepository, StoreMappingRepositoryImpl};
