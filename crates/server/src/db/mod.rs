//! Database access layer.
//!
//! Each submodule owns the queries for one table. All queries use the
//! runtime-checked `sqlx` API so the crate builds without a live database.

pub mod email_queue;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod webhook_events;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data integrity issue (e.g., invalid data in database)
    #[error("Data corruption: {0}")]
    DataCorruption(String),

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Creates a `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns an error if the database connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
