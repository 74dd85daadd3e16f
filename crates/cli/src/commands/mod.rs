//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod plans;
pub mod subscriptions;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use bizshop_api::db::RepositoryError;
use bizshop_api::error::AppError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    App(#[from] AppError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, super_admin")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("No account with email: {0}")]
    UserNotFound(String),
}

/// Connect to the application database.
///
/// # Errors
///
/// Returns `CliError::MissingEnvVar` when no URL is configured.
pub async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("BIZSHOP_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("BIZSHOP_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(bizshop_api::db::create_pool(&SecretString::from(database_url)).await?)
}
