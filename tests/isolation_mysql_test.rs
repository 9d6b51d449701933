//! Store isolation against a real MySQL/TiDB database
//!
//! Run with `DATABASE_URL=mysql://... cargo test -- --ignored`.

use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::sync::Arc;
use storegate_core::domain::{
    AuthenticatedUser, MembershipRole, RequestContext, TenantId, UserId,
};
use storegate_core::error::ErrorKind;
use storegate_core::query::{Filter, ScopedQueryEnforcer, SortDirection, TenantTable};
use storegate_core::repository::{
    MembershipRepository, MembershipRepositoryImpl, StoreMappingRepository,
    StoreMappingRepositoryImpl,
};
use storegate_core::service::AuthorizationGuard;

const PRODUCTS: TenantTable = TenantTable::new("isolation_test_products").soft_delete("deleted_at");

async fn setup() -> MySqlPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = MySqlPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS isolation_test_products (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            tenant_id CHAR(36) NOT NULL,
            name VARCHAR(255) NOT NULL,
            deleted_at TIMESTAMP NULL,
            INDEX idx_isolation_test_products_tenant (tenant_id)
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

async fn create_tenant(pool: &MySqlPool, status: &str) -> TenantId {
    let tenant_id = TenantId::generate();
    sqlx::query("INSERT INTO tenants (id, name, status) VALUES (?, ?, ?)")
        .bind(tenant_id)
        .bind(format!("store {}", tenant_id))
        .bind(status)
        .execute(pool)
        .await
        .unwrap();
    tenant_id
}

async fn add_member(pool: &MySqlPool, user_id: UserId, tenant_id: TenantId, role: &str) {
    sqlx::query(
        "INSERT INTO tenant_memberships (id, user_id, tenant_id, role) VALUES (?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(tenant_id)
    .bind(role)
    .execute(pool)
    .await
    .unwrap();
}

async fn add_product(pool: &MySqlPool, tenant_id: TenantId, name: &str) {
    sqlx::query("INSERT INTO isolation_test_products (tenant_id, name) VALUES (?, ?)")
        .bind(tenant_id)
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
}

fn names(rows: Vec<(String,)>) -> Vec<String> {
    rows.into_iter().map(|(name,)| name).collect()
}

#[tokio::test]
#[ignore]
async fn test_repositories_resolve_mappings_and_memberships() {
    let pool = setup().await;
    let t1 = create_tenant(&pool, "active").await;
    let suspended = create_tenant(&pool, "suspended").await;
    let user = UserId::new_v4();
    add_member(&pool, user, t1, "admin").await;
    add_member(&pool, user, suspended, "owner").await;

    let external = format!("store_{}", t1.to_string().replace('-', ""));
    sqlx::query("INSERT INTO external_store_mappings (tenant_id, external_store_id) VALUES (?, ?)")
        .bind(t1)
        .bind(&external)
        .execute(&pool)
        .await
        .unwrap();

    let mappings = StoreMappingRepositoryImpl::new(pool.clone());
    let found = mappings.find_external_id_by_tenant(t1).await.unwrap().unwrap();
    assert_eq!(found.as_str(), external);
    assert_eq!(
        mappings.find_tenant_by_external_id(&found).await.unwrap(),
        Some(t1)
    );

    let memberships = MembershipRepositoryImpl::new(pool.clone());
    let membership = memberships
        .find_active_membership(user, t1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(membership.role, MembershipRole::Admin);
    assert!(memberships
        .find_active_membership(user, suspended)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore]
async fn test_guard_with_database() {
    let pool = setup().await;
    let t1 = create_tenant(&pool, "active").await;
    let t2 = create_tenant(&pool, "active").await;
    let user = UserId::new_v4();
    add_member(&pool, user, t1, "viewer").await;

    let guard = AuthorizationGuard::new(
        Arc::new(StoreMappingRepositoryImpl::new(pool.clone())),
        Arc::new(MembershipRepositoryImpl::new(pool.clone())),
    );
    let as_user = || RequestContext::new().with_user(AuthenticatedUser::new(user));

    let scoped = guard
        .authorize(as_user().with_store_id(t1.to_string()))
        .await
        .unwrap();
    assert_eq!(scoped.tenant_id(), t1);
    assert_eq!(scoped.role(), MembershipRole::Viewer);

    let err = guard
        .authorize(as_user().with_store_id(t2.to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
#[ignore]
async fn test_scoped_queries_are_disjoint() {
    let pool = setup().await;
    let t1 = create_tenant(&pool, "active").await;
    let t2 = create_tenant(&pool, "active").await;
    for name in ["apple", "banana", "cherry"] {
        add_product(&pool, t1, name).await;
    }
    add_product(&pool, t2, "apple").await;

    let t1_rows: Vec<(String,)> = ScopedQueryEnforcer::scope(PRODUCTS, &t1.to_string())
        .unwrap()
        .select(&["name"])
        .order_by("name", SortDirection::Asc)
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(names(t1_rows), vec!["apple", "banana", "cherry"]);

    let t2_query = ScopedQueryEnforcer::scope(PRODUCTS, &t2.to_string()).unwrap();
    assert_eq!(t2_query.count(&pool).await.unwrap(), 1);

    // A caller filter can narrow but never widen the tenant filter.
    let narrowed = ScopedQueryEnforcer::scope(PRODUCTS, &t2.to_string())
        .unwrap()
        .filter(Filter::any_of("name", ["banana", "cherry"]));
    assert_eq!(narrowed.count(&pool).await.unwrap(), 0);

    let (page, total) = ScopedQueryEnforcer::scope(PRODUCTS, &t1.to_string())
        .unwrap()
        .select(&["name"])
        .order_by("name", SortDirection::Asc)
        .page(2, 2)
        .fetch_with_count::<(String,)>(&pool)
        .await
        .unwrap();
    assert_eq!(names(page), vec!["cherry"]);
    assert_eq!(total, 3);
}

#[tokio::test]
#[ignore]
async fn test_soft_delete_stays_in_tenant() {
    let pool = setup().await;
    let t1 = create_tenant(&pool, "active").await;
    let t2 = create_tenant(&pool, "active").await;
    add_product(&pool, t1, "shared").await;
    add_product(&pool, t2, "shared").await;

    let deleted = ScopedQueryEnforcer::scope(PRODUCTS, &t1.to_string())
        .unwrap()
        .filter(Filter::eq("name", "shared"))
        .soft_delete(&pool)
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let t1_query = ScopedQueryEnforcer::scope(PRODUCTS, &t1.to_string()).unwrap();
    assert_eq!(t1_query.count(&pool).await.unwrap(), 0);
    assert_eq!(t1_query.include_deleted().count(&pool).await.unwrap(), 1);

    let t2_query = ScopedQueryEnforcer::scope(PRODUCTS, &t2.to_string()).unwrap();
    assert_eq!(t2_query.count(&pool).await.unwrap(), 1);
}
