//! External store mapping repository
//!
//! Read-only. Both lookups are point reads on a unique key.

use crate::domain::{ExternalStoreId, TenantId};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreMappingRepository: Send + Sync {
    async fn find_tenant_by_external_id(
        &self,
        external_id: &ExternalStoreId,
    ) -> Result<Option<TenantId>>;

    async fn find_external_id_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<ExternalStoreId>>;
}

pub struct StoreMappingRepositoryImpl {
    pool: MySqlPool,
}

impl StoreMappingRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreMappingRepository for StoreMappingRepositoryImpl {
    async fn find_tenant_by_external_id(
        &self,
        external_id: &ExternalStoreId,
    ) -> Result<Option<TenantId>> {
        let row: Option<(TenantId,)> = sqlx::query_as(
            r#"
            SELECT tenant_id
            FROM external_store_mappings
            WHERE external_store_id = ?
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(tenant_id,)| tenant_id))
    }

    async fn find_external_id_by_tenant(
        &self,
        tenant_id: TenantId,
    ) -> Result<Option<ExternalStoreId>> {
        let row: Option<(ExternalStoreId,)> = sqlx::query_as(
            r#"
            SELECT external_store_id
            FROM external_store_mappings
            WHERE tenant_id = ?
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(external_id,)| external_id))
    }
}
