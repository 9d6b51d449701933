//! Store identifier translation
//!
//! Turns either identifier form into the canonical tenant id, looking up the
//! external mapping where one is needed.

use crate::domain::{ExternalStoreId, TenantId};
use crate::error::{AppError, ErrorCause};
use crate::identifier::{classify, Classification};
use crate::repository::StoreMappingRepository;
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Canonical form of a caller-supplied store identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedStore {
    pub tenant_id: TenantId,
    /// Present only when a mapping exists
    pub external_store_id: Option<ExternalStoreId>,
}

#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("invalid store identifier format")]
    InvalidFormat,

    /// Well-formed external identifier without a mapping. Carries nothing
    /// about which part of the identifier failed to resolve.
    #[error("store identifier not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<TranslationError> for AppError {
    /// Collapse translation failures into the guard's taxonomy. An unknown
    /// store is reported exactly like a store the caller cannot access.
    fn from(err: TranslationError) -> Self {
        match err {
            TranslationError::InvalidFormat => AppError::BadRequest(
                ErrorCause::InvalidStoreIdFormat,
                "invalid store identifier format".to_string(),
            ),
            TranslationError::NotFound => AppError::store_access_denied(ErrorCause::StoreNotFound),
            TranslationError::Store(e) => e,
        }
    }
}

pub struct IdentifierTranslator<M: StoreMappingRepository> {
    mappings: Arc<M>,
}

impl<M: StoreMappingRepository> IdentifierTranslator<M> {
    pub fn new(mappings: Arc<M>) -> Self {
        Self { mappings }
    }

    pub async fn normalize(&self, raw: &str) -> Result<NormalizedStore, TranslationError> {
        let classification = classify(raw);
        counter!(
            "storegate_identifier_classifications_total",
            "kind" => classification.kind()
        )
        .increment(1);

        match classification {
            Classification::Invalid => Err(TranslationError::InvalidFormat),
            Classification::Canonical(tenant_id) => {
                let external_store_id = self.lookup_external_id(tenant_id).await;
                Ok(NormalizedStore {
                    tenant_id,
                    external_store_id,
                })
            }
            Classification::External(external_id) => {
                match self.mappings.find_tenant_by_external_id(&external_id).await? {
                    Some(tenant_id) => Ok(NormalizedStore {
                        tenant_id,
                        external_store_id: Some(external_id),
                    }),
                    None => Err(TranslationError::NotFound),
                }
            }
        }
    }

    /// Best-effort reverse lookup; absence and lookup failures both yield `None`.
    async fn lookup_external_id(&self, tenant_id: TenantId) -> Option<ExternalStoreId> {
        match self.mappings.find_external_id_by_tenant(tenant_id).await {
            Ok(external_id) => external_id,
            Err(e) => {
                warn!(
                    tenant_id = %tenant_id,
                    cause = %e.cause(),
                    "External store id lookup failed, continuing without it"
                );
                None
            }
        }
    }
}
