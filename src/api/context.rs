//! Scoped context endpoints
//!
//! Lets a client confirm which store its credentials and identifier resolve
//! to before issuing store-scoped writes.

use crate::domain::{MembershipRole, ScopedContext, TenantId, UserId};
use crate::error::Result;
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ContextResponse {
    pub tenant_id: TenantId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_store_id: Option<String>,
    pub user_id: UserId,
    pub role: MembershipRole,
}

impl From<&ScopedContext> for ContextResponse {
    fn from(ctx: &ScopedContext) -> Self {
        Self {
            tenant_id: ctx.tenant_id(),
            external_store_id: ctx.external_store_id().map(|id| id.as_str().to_string()),
            user_id: ctx.user().user_id,
            role: ctx.role(),
        }
    }
}

/// GET /api/v1/context
pub async fn current(ctx: ScopedContext) -> Json<ContextResponse> {
    Json(ContextResponse::from(&ctx))
}

#[derive(Debug, Deserialize)]
pub struct VerifyStoreInput {
    pub store_id: String,
}

/// POST /api/v1/context/verify
///
/// 204 when `store_id` names the scoped store in either form.
pub async fn verify(ctx: ScopedContext, Json(input): Json<VerifyStoreInput>) -> Result<StatusCode> {
    ctx.ensure_store_id(&input.store_id)?;
    Ok(StatusCode::NO_CONTENT)
}
