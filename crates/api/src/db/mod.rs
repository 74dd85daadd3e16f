//! Database operations for the BizShop `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users` - Accounts, roles and subscription state
//! - `stores` - Storefronts owned by users
//! - `categories` / `products` - Store catalog
//! - `orders` - Orders with their item snapshot and fee split
//! - `store_managers` - Delegated store operators
//! - `discount_codes` - Per-store discount codes
//! - `payment_events` - Applied gateway events (idempotency ledger)
//! - `tower_sessions.session` - Session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p bizshop-cli -- migrate
//! ```
//!
//! # Transactions
//!
//! Reads and single-statement writes go through the `*Repository` types,
//! which hold a pool. Steps that must share a transaction with a cap check
//! or a row lock are free functions taking `&mut PgConnection`.

pub mod categories;
pub mod discounts;
pub mod managers;
pub mod orders;
pub mod payments;
pub mod products;
pub mod stats;
pub mod stores;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use categories::CategoryRepository;
pub use discounts::DiscountRepository;
pub use managers::ManagerRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use stats::StatsRepository;
pub use stores::StoreRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to [`RepositoryError::Conflict`] with `message`.
pub(crate) fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(message.to_owned());
        }
        RepositoryError::Database(e)
    }
}

/// Convert a row count to the `u64` the limit checks take.
pub(crate) fn count_to_u64(count: i64) -> Result<u64, RepositoryError> {
    u64::try_from(count)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative row count: {count}")))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_to_u64() {
        assert_eq!(count_to_u64(3).ok(), Some(3));
        assert!(matches!(
            count_to_u64(-1),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_non_unique_errors_stay_database_errors() {
        let mapped = conflict_on_unique("slug already taken")(sqlx::Error::RowNotFound);
        assert!(matches!(mapped, RepositoryError::Database(_)));
    }
}
