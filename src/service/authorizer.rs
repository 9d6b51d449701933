//! Store membership authorization

use crate::domain::{Membership, TenantId, UserId};
use crate::error::{AppError, ErrorCause, Result};
use crate::repository::MembershipRepository;
use std::sync::Arc;
use tracing::warn;

pub struct MembershipAuthorizer<R: MembershipRepository> {
    memberships: Arc<R>,
}

impl<R: MembershipRepository> MembershipAuthorizer<R> {
    pub fn new(memberships: Arc<R>) -> Self {
        Self { memberships }
    }

    /// Confirm `user_id` holds an active membership on `tenant_id`.
    ///
    /// An unknown store and a store the user does not belong to fail with the
    /// same Forbidden error.
    pub async fn authorize(&self, user_id: UserId, tenant_id: TenantId) -> Result<Membership> {
        let membership = self
            .memberships
            .find_active_membership(user_id, tenant_id)
            .await?;

        match membership {
            Some(m) if m.grants(user_id, tenant_id) => Ok(m),
            Some(m) => {
                warn!(
                    membership_id = %m.id.0,
                    "Membership store returned a record that does not grant the requested scope"
                );
                Err(AppError::store_access_denied(ErrorCause::NotAMember))
            }
            None => Err(AppError::store_access_denied(ErrorCause::NotAMember)),
        }
    }
}
