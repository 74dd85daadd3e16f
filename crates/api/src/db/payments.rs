//! Ledger of applied payment gateway events.
//!
//! Every verified payment and every webhook delivery is recorded under a
//! unique key before it touches a subscription. A key that is already
//! present means the event was applied before and must not be re-applied.

use sqlx::PgConnection;

use bizshop_core::UserId;

use super::RepositoryError;

/// Record an event. Returns `false` when the key was already recorded.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn record(
    conn: &mut PgConnection,
    event_key: &str,
    kind: &str,
    user_id: Option<UserId>,
    payload: &serde_json::Value,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        INSERT INTO payment_events (event_key, kind, user_id, payload)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (event_key) DO NOTHING
        ",
    )
    .bind(event_key)
    .bind(kind)
    .bind(user_id)
    .bind(payload)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
