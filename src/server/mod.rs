//! HTTP server setup

use crate::api;
use crate::config::Config;
use crate::jwt::JwtManager;
use crate::middleware::{normalize_error_response, ObservabilityLayer, SanitizedMakeSpan};
use crate::repository::{MembershipRepositoryImpl, StoreMappingRepositoryImpl};
use crate::service::AuthorizationGuard;
use crate::state::{HasMetrics, HasTenantGuard};
use anyhow::Result;
use axum::{
    http::HeaderName,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Production application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub tenant_guard: Arc<AuthorizationGuard<StoreMappingRepositoryImpl, MembershipRepositoryImpl>>,
    pub jwt_manager: JwtManager,
    pub prometheus_handle: Option<PrometheusHandle>,
}

impl HasTenantGuard for AppState {
    type MappingRepo = StoreMappingRepositoryImpl;
    type MembershipRepo = MembershipRepositoryImpl;

    fn tenant_guard(&self) -> &AuthorizationGuard<Self::MappingRepo, Self::MembershipRepo> {
        &self.tenant_guard
    }

    fn jwt_manager(&self) -> &JwtManager {
        &self.jwt_manager
    }

    fn store_id_header(&self) -> &HeaderName {
        &self.config.tenancy.store_id_header
    }

    async fn check_ready(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.db_pool).await.is_ok()
    }
}

impl HasMetrics for AppState {
    fn prometheus_handle(&self) -> Option<&PrometheusHandle> {
        self.prometheus_handle.as_ref()
    }
}

/// Run the HTTP server until interrupted
pub async fn run(config: Config, prometheus_handle: Option<PrometheusHandle>) -> Result<()> {
    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    info!("Connected to database");

    let mapping_repo = Arc::new(StoreMappingRepositoryImpl::new(db_pool.clone()));
    let membership_repo = Arc::new(MembershipRepositoryImpl::new(db_pool.clone()));
    let tenant_guard = Arc::new(AuthorizationGuard::new(mapping_repo, membership_repo));
    let jwt_manager = JwtManager::new(config.jwt.clone());

    let http_addr = config.http_addr();
    let state = AppState {
        config: Arc::new(config),
        db_pool,
        tenant_guard,
        jwt_manager,
        prometheus_handle,
    };

    let app = build_router(state);

    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server listening on {}", http_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Build the HTTP router
pub fn build_router<S: HasTenantGuard + HasMetrics>(state: S) -> Router {
    Router::new()
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready::<S>))
        .route("/metrics", get(api::metrics::metrics_handler::<S>))
        .route("/api/v1/context", get(api::context::current))
        .route("/api/v1/context/verify", post(api::context::verify))
        .layer(axum::middleware::from_fn(normalize_error_response))
        .layer(TraceLayer::new_for_http().make_span_with(SanitizedMakeSpan))
        .layer(ObservabilityLayer)
        .with_state(state)
}
