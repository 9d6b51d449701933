//! Authorization guard
//!
//! Every inbound operation passes through [`AuthorizationGuard::authorize`]
//! exactly once. The steps run strictly in order and each one consumes the
//! output of the previous step, so a later check cannot run before an earlier
//! one has passed and no partially-checked context ever escapes:
//!
//! 1. caller authenticated
//! 2. store identifier present
//! 3. identifier normalized to the canonical tenant id
//! 4. active membership on that tenant
//! 5. scoped context built from the above plus the untouched session fields
//!
//! Nothing here retries. Every step is a read or a pure computation, so a
//! failure is a client error, an authorization decision, or a bug.

use super::authorizer::MembershipAuthorizer;
use super::translator::{IdentifierTranslator, NormalizedStore};
use crate::domain::{
    AuthenticatedUser, Membership, RequestContext, ScopedContext, SessionMetadata,
};
use crate::error::{AppError, ErrorCause, Result};
use crate::repository::{MembershipRepository, StoreMappingRepository};
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, warn};

/// Caller identity established, store identifier not yet inspected
struct Authenticated {
    user: AuthenticatedUser,
    raw_store_id: Option<String>,
    session: SessionMetadata,
}

/// Store identifier present, not yet validated
struct Identified {
    user: AuthenticatedUser,
    raw_store_id: String,
    session: SessionMetadata,
}

struct Normalized {
    user: AuthenticatedUser,
    store: NormalizedStore,
    session: SessionMetadata,
}

struct Authorized {
    normalized: Normalized,
    membership: Membership,
}

pub struct AuthorizationGuard<M: StoreMappingRepository, R: MembershipRepository> {
    translator: IdentifierTranslator<M>,
    authorizer: MembershipAuthorizer<R>,
}

impl<M: StoreMappingRepository, R: MembershipRepository> AuthorizationGuard<M, R> {
    pub fn new(mappings: Arc<M>, memberships: Arc<R>) -> Self {
        Self {
            translator: IdentifierTranslator::new(mappings),
            authorizer: MembershipAuthorizer::new(memberships),
        }
    }

    pub fn translator(&self) -> &IdentifierTranslator<M> {
        &self.translator
    }

    pub fn authorizer(&self) -> &MembershipAuthorizer<R> {
        &self.authorizer
    }

    /// Run the full pipeline for one request.
    pub async fn authorize(&self, ctx: RequestContext) -> Result<ScopedContext> {
        let request_id = ctx.session.request_id.clone();
        let user_id = ctx.user.as_ref().map(|u| u.user_id);

        let result = self.run(ctx).await;

        match &result {
            Ok(scoped) => {
                counter!(
                    "storegate_guard_decisions_total",
                    "outcome" => "allowed",
                    "cause" => "none"
                )
                .increment(1);
                debug!(
                    request_id = ?request_id,
                    user_id = %scoped.user().user_id,
                    tenant_id = %scoped.tenant_id(),
                    role = %scoped.role(),
                    "Store access granted"
                );
            }
            Err(e) => {
                counter!(
                    "storegate_guard_decisions_total",
                    "outcome" => "denied",
                    "cause" => e.cause().as_str()
                )
                .increment(1);
                warn!(
                    request_id = ?request_id,
                    user_id = ?user_id.map(|id| id.to_string()),
                    kind = %e.kind(),
                    cause = %e.cause(),
                    "Store access denied"
                );
            }
        }

        result
    }

    async fn run(&self, ctx: RequestContext) -> Result<ScopedContext> {
        let authenticated = require_authenticated(ctx)?;
        let identified = require_store_id(authenticated)?;
        let normalized = self.normalize(identified).await?;
        let authorized = self.authorize_membership(normalized).await?;
        Ok(propagate(authorized))
    }

    async fn normalize(&self, identified: Identified) -> Result<Normalized> {
        let store = self.translator.normalize(&identified.raw_store_id).await?;
        debug!(tenant_id = %store.tenant_id, "Store identifier normalized");
        Ok(Normalized {
            user: identified.user,
            store,
            session: identified.session,
        })
    }

    async fn authorize_membership(&self, normalized: Normalized) -> Result<Authorized> {
        let membership = self
            .authorizer
            .authorize(normalized.user.user_id, normalized.store.tenant_id)
            .await?;
        Ok(Authorized {
            normalized,
            membership,
        })
    }
}

/// Step 1. Runs before the store identifier is looked at, so an anonymous
/// caller learns nothing about any identifier it sent.
fn require_authenticated(ctx: RequestContext) -> Result<Authenticated> {
    let RequestContext {
        raw_store_id,
        user,
        session,
    } = ctx;

    let user = user.ok_or_else(|| {
        AppError::Unauthenticated(
            ErrorCause::NotAuthenticated,
            "Authentication required".to_string(),
        )
    })?;

    Ok(Authenticated {
        user,
        raw_store_id,
        session,
    })
}

/// Step 2.
fn require_store_id(authenticated: Authenticated) -> Result<Identified> {
    match authenticated.raw_store_id {
        Some(raw) if !raw.is_empty() => Ok(Identified {
            user: authenticated.user,
            raw_store_id: raw,
            session: authenticated.session,
        }),
        _ => Err(AppError::BadRequest(
            ErrorCause::MissingStoreId,
            "missing tenant identifier".to_string(),
        )),
    }
}

/// Step 5. Only the identifier fields are set; the session is moved through as-is.
fn propagate(authorized: Authorized) -> ScopedContext {
    let Authorized {
        normalized,
        membership,
    } = authorized;

    ScopedContext::new(
        normalized.store.tenant_id,
        normalized.store.external_store_id,
        normalized.user,
        membership.role,
        normalized.session,
    )
}
