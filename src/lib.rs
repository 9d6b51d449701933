//! Storegate Core - store-scoped authorization
//!
//! Resolves the store an inbound request targets, confirms the caller is an
//! active member of it, and hands downstream code a tenant-scoped query
//! surface that cannot be used without the tenant filter.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod identifier;
pub mod jwt;
pub mod middleware;
pub mod migration;
pub mod query;
pub mod repository;
pub mod server;
pub mod service;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, Result};
