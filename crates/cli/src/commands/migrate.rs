//! Database migration command.
//!
//! Applies the migrations embedded in the server crate. The server never
//! touches the schema on startup; this command is the only path that does.
//!
//! # Usage
//!
//! ```bash
//! salonkit migrate run
//! ```
//!
//! # Environment Variables
//!
//! - `SALONKIT_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)

use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration application error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns an error if the database URL is missing, the connection fails, or
/// a migration fails to apply.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url =
        super::database_url().ok_or(MigrationError::MissingEnvVar("SALONKIT_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = salonkit_server::db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    salonkit_server::MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
