//! Application state traits for dependency injection
//!
//! Handlers and extractors are generic over these traits so the same code runs
//! against the MySQL-backed `AppState` and the in-memory state used in tests.

use crate::jwt::JwtManager;
use crate::repository::{MembershipRepository, StoreMappingRepository};
use crate::service::AuthorizationGuard;
use axum::http::HeaderName;
use metrics_exporter_prometheus::PrometheusHandle;

/// State that can authorize a request against a store.
pub trait HasTenantGuard: Clone + Send + Sync + 'static {
    /// The external store mapping repository type
    type MappingRepo: StoreMappingRepository;
    /// The membership repository type
    type MembershipRepo: MembershipRepository;

    /// Get the authorization guard
    fn tenant_guard(&self) -> &AuthorizationGuard<Self::MappingRepo, Self::MembershipRepo>;

    /// Get the JWT manager used to verify identity tokens
    fn jwt_manager(&self) -> &JwtManager;

    /// Name of the request header carrying the store identifier
    fn store_id_header(&self) -> &HeaderName;

    /// Check if the backing store is reachable
    fn check_ready(&self) -> impl std::future::Future<Output = bool> + Send;
}

/// State that may expose Prometheus metrics.
pub trait HasMetrics: Clone + Send + Sync + 'static {
    fn prometheus_handle(&self) -> Option<&PrometheusHandle>;
}
