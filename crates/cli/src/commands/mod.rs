//! CLI command implementations.

pub mod migrate;
pub mod order;
pub mod product;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use cartwright_storefront::db::{self, RepositoryError};
use cartwright_storefront::services::ServiceError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Catalog file could not be read.
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Catalog file is not valid YAML for a product list.
    #[error("Invalid catalog: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// One or more products failed validation.
    #[error("{0} invalid product(s)")]
    InvalidProducts(usize),

    /// Storage error.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Order service refused the change.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Connect to the storefront database named by the environment.
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&database_url).await?)
}
