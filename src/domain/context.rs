//! Per-request contexts
//!
//! A [`RequestContext`] is what the transport hands us: an unvalidated store
//! identifier and whatever caller identity the authentication layer found.
//! A [`ScopedContext`] is what the authorization guard hands back once every
//! check has passed. It is the only way downstream code learns which store it
//! is working for.

use super::common::{ExternalStoreId, TenantId, UserId};
use super::membership::MembershipRole;
use crate::error::{AppError, ErrorCause, Result};
use crate::identifier::{classify, Classification};
use serde::Serialize;

/// Caller identity supplied by the authentication layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Transport-level metadata carried through untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionMetadata {
    pub request_id: Option<String>,
    pub session_id: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Inbound, unvalidated request state
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Store identifier exactly as supplied by the caller
    pub raw_store_id: Option<String>,
    /// `None` until (and unless) authentication succeeded upstream
    pub user: Option<AuthenticatedUser>,
    pub session: SessionMetadata,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: AuthenticatedUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_store_id(mut self, raw: impl Into<String>) -> Self {
        self.raw_store_id = Some(raw.into());
        self
    }

    pub fn with_session(mut self, session: SessionMetadata) -> Self {
        self.session = session;
        self
    }
}

/// Validated store scope for exactly one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedContext {
    tenant_id: TenantId,
    external_store_id: Option<ExternalStoreId>,
    user: AuthenticatedUser,
    role: MembershipRole,
    session: SessionMetadata,
}

impl ScopedContext {
    pub(crate) fn new(
        tenant_id: TenantId,
        external_store_id: Option<ExternalStoreId>,
        user: AuthenticatedUser,
        role: MembershipRole,
        session: SessionMetadata,
    ) -> Self {
        Self {
            tenant_id,
            external_store_id,
            user,
            role,
            session,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn external_store_id(&self) -> Option<&ExternalStoreId> {
        self.external_store_id.as_ref()
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    pub fn role(&self) -> MembershipRole {
        self.role
    }

    pub fn session(&self) -> &SessionMetadata {
        &self.session
    }

    /// Reject a payload that names a different store than the one in scope.
    ///
    /// The payload may name the store by either identifier. Anything else,
    /// including a malformed identifier, is a mismatch.
    pub fn ensure_store_id(&self, payload_store_id: &str) -> Result<()> {
        let matches = match classify(payload_store_id) {
            Classification::Canonical(id) => id == self.tenant_id,
            Classification::External(id) => self.external_store_id.as_ref() == Some(&id),
            Classification::Invalid => false,
        };

        if matches {
            Ok(())
        } else {
            Err(AppError::BadRequest(
                ErrorCause::StoreIdMismatch,
                "store identifier in payload does not match the request scope".to_string(),
            ))
        }
    }
}
