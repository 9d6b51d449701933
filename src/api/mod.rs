//! REST API handlers

pub mod context;
pub mod health;
pub mod metrics;
