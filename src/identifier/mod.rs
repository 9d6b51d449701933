//! Store identifier grammar
//!
//! A store may be addressed by its canonical UUID or by the token the external
//! commerce engine issued for it. [`classify`] is the only place either
//! grammar is defined; it performs no I/O and never rewrites its input.

use crate::domain::{ExternalStoreId, TenantId};
use uuid::Uuid;

/// Prefix of identifiers issued by the external commerce engine.
pub const EXTERNAL_ID_PREFIX: &str = "store_";

/// Inputs longer than this are rejected before any grammar is tried.
pub const MAX_IDENTIFIER_LEN: usize = 128;

lazy_static::lazy_static! {
    /// Hyphenated UUID with a version nibble of 1-8 and an RFC 4122 variant.
    static ref CANONICAL_REGEX: regex::Regex = regex::Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[1-8][0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$"
    )
    .unwrap();

    static ref EXTERNAL_REGEX: regex::Regex =
        regex::Regex::new(r"^store_[A-Za-z0-9]+$").unwrap();
}

/// Result of classifying a raw store identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Canonical(TenantId),
    External(ExternalStoreId),
    Invalid,
}

impl Classification {
    pub fn kind(&self) -> &'static str {
        match self {
            Classification::Canonical(_) => "canonical",
            Classification::External(_) => "external",
            Classification::Invalid => "invalid",
        }
    }
}

/// Classify a raw identifier as canonical, external, or invalid.
pub fn classify(raw: &str) -> Classification {
    if raw.is_empty() || raw.len() > MAX_IDENTIFIER_LEN {
        return Classification::Invalid;
    }

    if CANONICAL_REGEX.is_match(raw) {
        return match Uuid::parse_str(raw) {
            Ok(uuid) => Classification::Canonical(TenantId::from_uuid(uuid)),
            Err(_) => Classification::Invalid,
        };
    }

    if EXTERNAL_REGEX.is_match(raw) {
        return Classification::External(ExternalStoreId::from_validated(raw));
    }

    Classification::Invalid
}
