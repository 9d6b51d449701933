//! HTTP middleware for Storegate Core
//!
//! - request context factory and the `ScopedContext` extractor
//! - request metrics and request id propagation
//! - sanitized request spans
//! - JSON normalization of framework error responses

pub mod error_response;
pub mod metrics;
pub mod request_context;
pub mod scoped;
pub mod trace;

pub use error_response::normalize_error_response;
pub use metrics::ObservabilityLayer;
pub use request_context::request_context_from_parts;
pub use trace::SanitizedMakeSpan;
