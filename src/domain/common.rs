//! Identifier types shared by the domain models
//!
//! UUIDs are stored as CHAR(36) in MySQL/TiDB. sqlx's uuid feature expects
//! BINARY(16), so the newtypes below encode through `String`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! char36_uuid {
    ($name:ident) => {
        impl sqlx::Type<sqlx::MySql> for $name {
            fn type_info() -> sqlx::mysql::MySqlTypeInfo {
                <String as sqlx::Type<sqlx::MySql>>::type_info()
            }

            fn compatible(ty: &sqlx::mysql::MySqlTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::MySql>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::MySql> for $name {
            fn decode(
                value: sqlx::mysql::MySqlValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <String as sqlx::Decode<sqlx::MySql>>::decode(value)?;
                Ok($name(Uuid::parse_str(&s)?))
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::MySql> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<u8>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <String as sqlx::Encode<sqlx::MySql>>::encode_by_ref(&self.to_string(), buf)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }
    };
}

/// Canonical tenant (store) identifier.
///
/// Obtained from [`crate::identifier::classify`] or decoded from the store,
/// so a `TenantId` in hand has already passed the canonical grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Fresh random identifier, for tenant provisioning and fixtures.
    pub fn generate() -> Self {
        TenantId(Uuid::new_v4())
    }

    pub(crate) fn from_uuid(uuid: Uuid) -> Self {
        TenantId(uuid)
    }

    /// Parse a raw identifier, accepting only the canonical grammar.
    pub fn parse(raw: &str) -> Option<Self> {
        match crate::identifier::classify(raw) {
            crate::identifier::Classification::Canonical(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

char36_uuid!(TenantId);

/// Authenticated user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new_v4() -> Self {
        UserId(Uuid::new_v4())
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        UserId(uuid)
    }
}

char36_uuid!(UserId);

/// Store identifier issued by the external commerce engine (`store_...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ExternalStoreId(String);

impl ExternalStoreId {
    pub(crate) fn from_validated(raw: &str) -> Self {
        ExternalStoreId(raw.to_string())
    }

    /// Parse a raw identifier, accepting only the external grammar.
    pub fn parse(raw: &str) -> Option<Self> {
        match crate::identifier::classify(raw) {
            crate::identifier::Classification::External(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExternalStoreId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl sqlx::Type<sqlx::MySql> for ExternalStoreId {
    fn type_info() -> sqlx::mysql::MySqlTypeInfo {
        <String as sqlx::Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &sqlx::mysql::MySqlTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::MySql>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::MySql> for ExternalStoreId {
    fn decode(value: sqlx::mysql::MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::MySql>>::decode(value)?;
        Ok(ExternalStoreId(s))
    }
}

impl<'q> sqlx::Encode<'q, sqlx::MySql> for ExternalStoreId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<u8>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::MySql>>::encode_by_ref(&self.0.as_str(), buf)
    }
}
