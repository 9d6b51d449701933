//! Common test utilities
//!
//! In-memory repositories and an application state that runs the real guard
//! and router without a database.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::HeaderName;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use storegate_core::config::JwtConfig;
use storegate_core::domain::{ExternalStoreId, Membership, MembershipRole, TenantId, UserId};
use storegate_core::error::{AppError, ErrorCause, Result};
use storegate_core::jwt::JwtManager;
use storegate_core::repository::{MembershipRepository, StoreMappingRepository};
use storegate_core::service::AuthorizationGuard;
use storegate_core::state::{HasMetrics, HasTenantGuard};
use tokio::sync::RwLock;

// ============================================================================
// Test Configuration
// ============================================================================

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-key-for-store-scoping".to_string(),
        issuer: "https://storegate.test".to_string(),
        identity_token_ttl_secs: 3600,
    }
}

pub fn create_test_jwt_manager() -> JwtManager {
    JwtManager::new(test_jwt_config())
}

pub fn identity_token_for(user_id: UserId) -> String {
    create_test_jwt_manager()
        .create_identity_token(user_id, Some("member@example.com"), None)
        .expect("Failed to create test identity token")
}

fn unavailable() -> AppError {
    AppError::Internal(
        ErrorCause::DatabaseError,
        anyhow::anyhow!("connection refused"),
    )
}

// ============================================================================
// Test Repository Implementations
// ============================================================================

/// External store mappings, keyed both ways
pub struct TestStoreMappingRepository {
    mappings: RwLock<HashMap<TenantId, ExternalStoreId>>,
    lookups: AtomicUsize,
    fail: AtomicBool,
}

impl TestStoreMappingRepository {
    pub fn new() -> Self {
        Self {
            mappings: RwLock::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub async fn add_mapping(&self, tenant_id: TenantId, external_id: &str) {
        let external_id = ExternalStoreId::parse(external_id).expect("valid external id");
        self.mappings.write().await.insert(tenant_id, external_id);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreMappingRepository for TestStoreMappingRepository {
    async fn find_tenant_by_external_id(
        &self,
        external_id: &ExternalStoreId,
    ) -> Result<Option<TenantId>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self
            .mappings
            .read()
            .await
            .iter()
            .find(|(_, ext)| *ext == external_id)
            .map(|(tenant_id, _)| *tenant_id))
    }

    async fn find_external_id_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<ExternalStoreId>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.mappings.read().await.get(&tenant_id).cloned())
    }
}

/// Memberships plus the set of tenants that are no longer active
pub struct TestMembershipRepository {
    memberships: RwLock<Vec<Membership>>,
    inactive_tenants: RwLock<HashSet<TenantId>>,
    lookups: AtomicUsize,
    fail: AtomicBool,
}

impl TestMembershipRepository {
    pub fn new() -> Self {
        Self {
            memberships: RwLock::new(vec![]),
            inactive_tenants: RwLock::new(HashSet::new()),
            lookups: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub async fn add_membership(&self, membership: Membership) {
        self.memberships.write().await.push(membership);
    }

    pub async fn deactivate_membership(&self, user_id: UserId, tenant_id: TenantId) {
        for m in self.memberships.write().await.iter_mut() {
            if m.user_id == user_id && m.tenant_id == tenant_id {
                m.is_active = false;
            }
        }
    }

    pub async fn suspend_tenant(&self, tenant_id: TenantId) {
        self.inactive_tenants.write().await.insert(tenant_id);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MembershipRepository for TestMembershipRepository {
    async fn find_active_membership(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> Result<Option<Membership>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        if self.inactive_tenants.read().await.contains(&tenant_id) {
            return Ok(None);
        }
        Ok(self
            .memberships
            .read()
            .await
            .iter()
            .find(|m| m.user_id == user_id && m.tenant_id == tenant_id && m.is_active)
            .cloned())
    }
}

// ============================================================================
// Test Application State
// ============================================================================

#[derive(Clone)]
pub struct TestAppState {
    pub mappings: Arc<TestStoreMappingRepository>,
    pub memberships: Arc<TestMembershipRepository>,
    pub guard: Arc<AuthorizationGuard<TestStoreMappingRepository, TestMembershipRepository>>,
    pub jwt_manager: JwtManager,
    pub store_id_header: HeaderName,
    pub ready: Arc<AtomicBool>,
    pub prometheus_handle: Option<PrometheusHandle>,
}

impl TestAppState {
    pub fn new() -> Self {
        let mappings = Arc::new(TestStoreMappingRepository::new());
        let memberships = Arc::new(TestMembershipRepository::new());
        let guard = Arc::new(AuthorizationGuard::new(
            mappings.clone(),
            memberships.clone(),
        ));
        Self {
            mappings,
            memberships,
            guard,
            jwt_manager: create_test_jwt_manager(),
            store_id_header: HeaderName::from_static("x-store-id"),
            ready: Arc::new(AtomicBool::new(true)),
            prometheus_handle: None,
        }
    }
}

impl HasTenantGuard for TestAppState {
    type MappingRepo = TestStoreMappingRepository;
    type MembershipRepo = TestMembershipRepository;

    fn tenant_guard(&self) -> &AuthorizationGuard<Self::MappingRepo, Self::MembershipRepo> {
        &self.guard
    }

    fn jwt_manager(&self) -> &JwtManager {
        &self.jwt_manager
    }

    fn store_id_header(&self) -> &HeaderName {
        &self.store_id_header
    }

    async fn check_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

impl HasMetrics for TestAppState {
    fn prometheus_handle(&self) -> Option<&PrometheusHandle> {
        self.prometheus_handle.as_ref()
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub const T1_EXTERNAL_ID: &str = "store_01HQWE123";

/// Two stores: `t1` (mapped to `T1_EXTERNAL_ID`) and `t2` (unmapped).
/// `alice` owns t1 only, `bob` is an editor of t2 only.
pub struct TwoStores {
    pub state: TestAppState,
    pub t1: TenantId,
    pub t2: TenantId,
    pub alice: UserId,
    pub bob: UserId,
}

pub async fn two_stores() -> TwoStores {
    let state = TestAppState::new();
    let t1 = TenantId::generate();
    let t2 = TenantId::generate();
    let alice = UserId::new_v4();
    let bob = UserId::new_v4();

    state.mappings.add_mapping(t1, T1_EXTERNAL_ID).await;
    state
        .memberships
        .add_membership(Membership::new(alice, t1, MembershipRole::Owner))
        .await;
    state
        .memberships
        .add_membership(Membership::new(bob, t2, MembershipRole::Editor))
        .await;

    TwoStores {
        state,
        t1,
        t2,
        alice,
        bob,
    }
}
