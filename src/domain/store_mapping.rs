//! External store mapping

use super::common::{ExternalStoreId, TenantId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Link between a tenant and the store id issued by the commerce engine.
///
/// At most one mapping per tenant, and each external id names exactly one
/// tenant. Mappings are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ExternalStoreMapping {
    pub tenant_id: TenantId,
    pub external_store_id: ExternalStoreId,
    pub created_at: DateTime<Utc>,
}

impl ExternalStoreMapping {
    pub fn new(tenant_id: TenantId, external_store_id: ExternalStoreId) -> Self {
        Self {
            tenant_id,
            external_store_id,
            created_at: Utc::now(),
        }
    }
}
