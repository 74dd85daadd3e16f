//! Store manager invitations and grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use bizshop_core::authz::ManagerGrant;
use bizshop_core::{Email, ManagerPermissions, ManagerStatus, StoreId, StoreManagerId, UserId};

/// A `store_managers` row joined with the manager's email.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoreManager {
    pub id: StoreManagerId,
    pub store_id: StoreId,
    pub user_id: UserId,
    pub email: Email,
    pub permissions: Json<ManagerPermissions>,
    pub status: ManagerStatus,
    pub invited_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoreManager {
    #[must_use]
    pub const fn grant(&self) -> ManagerGrant {
        ManagerGrant {
            permissions: self.permissions.0,
            status: self.status,
        }
    }
}

/// A pending invitation as seen by the invitee.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: StoreManagerId,
    pub store_id: StoreId,
    pub store_name: String,
    pub permissions: Json<ManagerPermissions>,
    pub invited_by: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteManager {
    pub email: String,
    #[serde(default)]
    pub permissions: ManagerPermissions,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePermissions {
    pub permissions: ManagerPermissions,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invite_rejects_unknown_permission_names() {
        let result: Result<InviteManager, _> = serde_json::from_str(
            r#"{"email":"m@shop.in","permissions":{"manageProdcts":true}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invite_defaults_to_no_permissions() {
        let invite: InviteManager = serde_json::from_str(r#"{"email":"m@shop.in"}"#).unwrap();
        assert_eq!(invite.permissions, ManagerPermissions::none());
    }
}
