//! User repository for database operations.
//!
//! Subscription writes always set the plan and both caps in one statement,
//! so `max_products`/`max_stores` can never drift from the plan.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use bizshop_core::subscription::SubscriptionState;
use bizshop_core::{Email, Role, SubscriptionStatus, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{User, UserWithPassword};

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Get a user by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// Get a user together with their password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<UserWithPassword>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPassword>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Create a user in the given initial subscription state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        password_hash: &str,
        name: Option<&str>,
        subscription: &SubscriptionState,
    ) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            INSERT INTO users (
                email, password_hash, name,
                subscription_plan, subscription_status, trial_ends_at,
                max_products, max_stores
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            ",
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(subscription.plan)
        .bind(subscription.status)
        .bind(subscription.trial_ends_at)
        .bind(subscription.max_products())
        .bind(subscription.max_stores())
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("email already exists"))?;

        Ok(user)
    }

    /// List users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    /// Find the user a gateway subscription belongs to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_gateway_subscription(
        &self,
        gateway_subscription_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE gateway_subscription_id = $1",
        )
        .bind(gateway_subscription_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Users whose trial or paid period has lapsed without renewal.
    ///
    /// This is a candidate list; the state machine has the final say per user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_due_for_expiry(&self, now: DateTime<Utc>) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(
            r"
            SELECT * FROM users
            WHERE (subscription_status = 'trial'
                   AND NOT auto_renewal AND trial_ends_at <= $1)
               OR (subscription_status = 'active'
                   AND NOT auto_renewal AND subscription_expires_at <= $1)
               OR (subscription_status = 'cancelled'
                   AND cancel_at_period_end AND subscription_expires_at <= $1)
            ORDER BY id
            ",
        )
        .bind(now)
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    /// Set a user's platform role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has this email.
    /// Returns `RepositoryError::Conflict` when promoting a second super admin.
    pub async fn set_role(&self, email: &Email, role: Role) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE email = $1 RETURNING *",
        )
        .bind(email)
        .bind(role)
        .fetch_optional(self.pool)
        .await
        .map_err(conflict_on_unique("a super admin already exists"))?
        .ok_or(RepositoryError::NotFound)
    }
}

// =============================================================================
// Transactional steps
// =============================================================================

/// Lock a user row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user does not exist.
pub async fn lock(conn: &mut PgConnection, id: UserId) -> Result<User, RepositoryError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)
}

/// Persist a subscription transition.
///
/// Guarded by the status the transition was computed from: if another
/// writer moved the subscription in between, nothing is written and
/// `RepositoryError::Conflict` is returned.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` when the guard fails.
pub async fn update_subscription(
    conn: &mut PgConnection,
    id: UserId,
    expected: SubscriptionStatus,
    next: &SubscriptionState,
) -> Result<User, RepositoryError> {
    sqlx::query_as::<_, User>(
        r"
        UPDATE users SET
            subscription_plan = $3,
            subscription_status = $4,
            trial_ends_at = $5,
            subscription_expires_at = $6,
            auto_renewal = $7,
            cancel_at_period_end = $8,
            gateway_subscription_id = $9,
            last_payment_id = $10,
            max_products = $11,
            max_stores = $12,
            updated_at = NOW()
        WHERE id = $1 AND subscription_status = $2
        RETURNING *
        ",
    )
    .bind(id)
    .bind(expected)
    .bind(next.plan)
    .bind(next.status)
    .bind(next.trial_ends_at)
    .bind(next.subscription_expires_at)
    .bind(next.auto_renewal)
    .bind(next.cancel_at_period_end)
    .bind(next.gateway_subscription_id.as_deref())
    .bind(next.last_payment_id.as_deref())
    .bind(next.max_products())
    .bind(next.max_stores())
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| RepositoryError::Conflict("subscription changed concurrently".to_owned()))
}

/// Delete a user and everything they own.
///
/// Walks every owned store first, then removes the user's manager rows and
/// the user.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user does not exist.
pub async fn delete_cascade(conn: &mut PgConnection, id: UserId) -> Result<(), RepositoryError> {
    let store_ids: Vec<bizshop_core::StoreId> =
        sqlx::query_scalar("SELECT id FROM stores WHERE user_id = $1 ORDER BY id")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

    for store_id in store_ids {
        super::stores::delete_cascade(&mut *conn, store_id).await?;
    }

    sqlx::query("DELETE FROM store_managers WHERE user_id = $1 OR invited_by = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
