//! Platform role management.
//!
//! Staff roles are never granted through the API. At most one account can
//! be the super admin; the database rejects a second one.

use bizshop_api::db::{RepositoryError, UserRepository};
use bizshop_core::{Email, Role};

use super::{CliError, connect};

/// Give an existing account the `admin` or `super_admin` role.
///
/// # Errors
///
/// Returns an error for an invalid role or email, an unknown account, or a
/// second super admin.
pub async fn promote(email: &str, role: &str) -> Result<(), CliError> {
    let role: Role = role
        .parse()
        .map_err(|_| CliError::InvalidRole(role.to_owned()))?;
    if !role.is_admin() {
        return Err(CliError::InvalidRole(role.to_string()));
    }
    set_role(email, role).await
}

/// Make an account a regular seller.
///
/// # Errors
///
/// Returns an error for an invalid email or an unknown account.
pub async fn demote(email: &str) -> Result<(), CliError> {
    set_role(email, Role::User).await
}

async fn set_role(email: &str, role: Role) -> Result<(), CliError> {
    let parsed = Email::parse(email).map_err(|e| CliError::InvalidEmail(e.to_string()))?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role(&parsed, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => CliError::UserNotFound(email.to_owned()),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, %role, "Role updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_promote_rejects_non_staff_role() {
        assert!(matches!(
            promote("seller@shop.in", "user").await,
            Err(CliError::InvalidRole(role)) if role == "user"
        ));
        assert!(matches!(
            promote("seller@shop.in", "owner").await,
            Err(CliError::InvalidRole(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_email_fails_before_connecting() {
        assert!(matches!(
            demote("not-an-email").await,
            Err(CliError::InvalidEmail(_))
        ));
    }
}
