//! Platform-wide statistics for the super admin.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use bizshop_core::PlanTier;

use super::RepositoryError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlatformTotals {
    pub users: i64,
    pub stores: i64,
    pub published_stores: i64,
    pub orders: i64,
    pub gross_merchandise_value: Decimal,
    pub platform_fees: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlanCount {
    pub plan: PlanTier,
    pub users: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    #[serde(flatten)]
    pub totals: PlatformTotals,
    pub users_by_plan: Vec<PlanCount>,
}

pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn platform(&self) -> Result<PlatformStats, RepositoryError> {
        let totals = sqlx::query_as::<_, PlatformTotals>(
            r"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM stores) AS stores,
                (SELECT COUNT(*) FROM stores WHERE is_published) AS published_stores,
                (SELECT COUNT(*) FROM orders WHERE status <> 'cancelled') AS orders,
                (SELECT COALESCE(SUM(total), 0) FROM orders WHERE status <> 'cancelled')
                    AS gross_merchandise_value,
                (SELECT COALESCE(SUM(transaction_fee), 0) FROM orders WHERE status <> 'cancelled')
                    AS platform_fees
            ",
        )
        .fetch_one(self.pool)
        .await?;

        let users_by_plan = sqlx::query_as::<_, PlanCount>(
            r"
            SELECT subscription_plan AS plan, COUNT(*) AS users
            FROM users
            GROUP BY subscription_plan
            ORDER BY subscription_plan
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(PlatformStats {
            totals,
            users_by_plan,
        })
    }
}
