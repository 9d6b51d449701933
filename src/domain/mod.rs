//! Domain models for Storegate Core

pub mod common;
pub mod context;
pub mod membership;
pub mod store_mapping;
pub mod tenant;

pub use common::*;
pub use context::*;
pub use membership::*;
pub use store_mapping::*;
pub use tenant::*;
