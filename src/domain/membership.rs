//! Membership domain model

use super::common::{TenantId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Role a user holds within a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    Owner,
    Admin,
    Editor,
    Viewer,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Owner => "owner",
            MembershipRole::Admin => "admin",
            MembershipRole::Editor => "editor",
            MembershipRole::Viewer => "viewer",
        }
    }
}

impl std::str::FromStr for MembershipRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "owner" => Ok(MembershipRole::Owner),
            "admin" => Ok(MembershipRole::Admin),
            "editor" => Ok(MembershipRole::Editor),
            "viewer" => Ok(MembershipRole::Viewer),
            _ => Err(format!("Unknown membership role: {}", s)),
        }
    }
}

impl std::fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'r> sqlx::Decode<'r, sqlx::MySql> for MembershipRole {
    fn decode(
        value: sqlx::mysql::MySqlValueRef<'r>,
    ) -> std::result::Result<Self, sqlx::error::BoxDynError> {
        let s: String = sqlx::Decode::<'r, sqlx::MySql>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl sqlx::Type<sqlx::MySql> for MembershipRole {
    fn type_info() -> sqlx::mysql::MySqlTypeInfo {
        <String as sqlx::Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &sqlx::mysql::MySqlTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::MySql>>::compatible(ty)
    }
}

/// User-store membership. At most one active row per (user, store).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Membership {
    #[sqlx(try_from = "String")]
    pub id: MembershipId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: MembershipRole,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

/// Membership row identifier (CHAR(36))
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MembershipId(pub Uuid);

impl TryFrom<String> for MembershipId {
    type Error = uuid::Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Ok(MembershipId(Uuid::parse_str(&value)?))
    }
}

impl Membership {
    /// New active membership, as created on invite acceptance.
    pub fn new(user_id: UserId, tenant_id: TenantId, role: MembershipRole) -> Self {
        Self {
            id: MembershipId(Uuid::new_v4()),
            user_id,
            tenant_id,
            role,
            is_active: true,
            joined_at: Utc::now(),
        }
    }

    /// Whether this record grants `user_id` access to `tenant_id`.
    pub fn grants(&self, user_id: UserId, tenant_id: TenantId) -> bool {
        self.is_active && self.user_id == user_id && self.tenant_id == tenant_id
    }
}
