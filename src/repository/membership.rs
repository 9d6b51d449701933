//! Membership repository

use crate::domain::{Membership, TenantId, UserId};
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Active membership of `user_id` on `tenant_id`, if the tenant is itself active.
    async fn find_active_membership(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> Result<Option<Membership>>;
}

pub struct MembershipRepositoryImpl {
    pool: MySqlPool,
}

impl MembershipRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for MembershipRepositoryImpl {
    async fn find_active_membership(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
    ) -> Result<Option<Membership>> {
        // Suspended and deleted tenants read as "no membership".
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT m.id, m.user_id, m.tenant_id, m.role, m.is_active, m.joined_at
            FROM tenant_memberships m
            INNER JOIN tenants t ON t.id = m.tenant_id
            WHERE m.user_id = ? AND m.tenant_id = ? AND m.is_active = TRUE
              AND t.status = 'active'
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }
}
