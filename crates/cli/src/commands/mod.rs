//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod stock;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Engine rejected the operation.
    #[error(transparent)]
    Commerce(#[from] lotus_core::CommerceError),

    /// Persistence failure below the engine.
    #[error(transparent)]
    Store(#[from] lotus_core::StoreError),

    /// Invalid command arguments.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Resolve the database URL: `STOREFRONT_DATABASE_URL`, then `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

/// Connect with a small pool; commands run one statement at a time.
async fn connect() -> Result<PgPool, CommandError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(url.expose_secret())
        .await?;
    Ok(pool)
}
