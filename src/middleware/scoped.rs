//! `ScopedContext` extractor
//!
//! Handlers that take a `ScopedContext` argument only run for callers the
//! guard has admitted. The guard runs at most once per request; later
//! extractions reuse the stored result.

use crate::domain::ScopedContext;
use crate::error::AppError;
use crate::middleware::request_context::request_context_from_parts;
use crate::state::HasTenantGuard;
use axum::{extract::FromRequestParts, http::request::Parts};

impl<S> FromRequestParts<S> for ScopedContext
where
    S: HasTenantGuard,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(scoped) = parts.extensions.get::<ScopedContext>() {
            return Ok(scoped.clone());
        }

        let ctx = request_context_from_parts(parts, state.jwt_manager(), state.store_id_header());
        let scoped = state.tenant_guard().authorize(ctx).await?;
        parts.extensions.insert(scoped.clone());
        Ok(scoped)
    }
}
