//! Subscription maintenance.

use chrono::Utc;

use bizshop_api::services::subscriptions::expire_due;

use super::{CliError, connect};

/// Apply the expiry transition to every account whose trial or paid period
/// has lapsed without renewal.
///
/// # Errors
///
/// Returns an error if the candidate query fails.
pub async fn expire(dry_run: bool) -> Result<(), CliError> {
    let pool = connect().await?;
    let summary = expire_due(&pool, Utc::now(), dry_run).await?;

    for user_id in &summary.expired {
        if dry_run {
            tracing::info!(%user_id, "Would expire");
        } else {
            tracing::info!(%user_id, "Expired");
        }
    }
    tracing::info!(
        expired = summary.expired.len(),
        skipped = summary.skipped,
        dry_run,
        "Done"
    );
    Ok(())
}
