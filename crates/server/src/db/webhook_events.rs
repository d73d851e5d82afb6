//! Database operations for the webhook event ledger.
//!
//! The ledger enforces at-most-once execution of webhook business logic. A
//! unique index on `event_id` makes [`record_start`] the claim step: when two
//! workers race on the same delivery, exactly one insert succeeds and the
//! loser sees [`RepositoryError::Conflict`]. Redeliveries of an already
//! claimed event only bump a counter.

use chrono::{DateTime, Utc};
use salonkit_core::WebhookEventId;
use sqlx::PgPool;

use super::RepositoryError;

/// A row in the webhook event ledger.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WebhookEventRow {
    /// Internal row ID.
    pub id: WebhookEventId,
    /// Provider-assigned event ID (`evt_...`).
    pub event_id: String,
    /// Provider event type (`checkout.session.completed`, ...).
    pub event_type: String,
    /// Whether business logic completed without error.
    pub success: bool,
    /// Number of redeliveries seen after the first claim.
    pub retry_count: i32,
    /// Error message from the recorded outcome, if any.
    pub error: Option<String>,
    /// Outcome details (order ID, account ID, skip reason, ...).
    pub metadata: serde_json::Value,
    /// When the event was first claimed.
    pub created_at: DateTime<Utc>,
    /// When the row was last touched.
    pub updated_at: DateTime<Utc>,
}

/// Look up a ledger row by provider event ID.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn find_by_event_id(
    pool: &PgPool,
    event_id: &str,
) -> Result<Option<WebhookEventRow>, RepositoryError> {
    let row = sqlx::query_as::<_, WebhookEventRow>(
        r"
        SELECT id, event_id, event_type, success, retry_count, error, metadata,
               created_at, updated_at
        FROM webhook_events
        WHERE event_id = $1
        ",
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Claim a provider event for processing.
///
/// Inserts the ledger row with `success = false` before any business logic
/// runs, so a crash mid-processing leaves a failure record rather than
/// nothing.
///
/// # Errors
///
/// Returns [`RepositoryError::Conflict`] if the event is already claimed
/// (unique violation on `event_id`), or a database error otherwise.
pub async fn record_start(
    pool: &PgPool,
    event_id: &str,
    event_type: &str,
) -> Result<WebhookEventRow, RepositoryError> {
    let row = sqlx::query_as::<_, WebhookEventRow>(
        r"
        INSERT INTO webhook_events (event_id, event_type, success)
        VALUES ($1, $2, false)
        RETURNING id, event_id, event_type, success, retry_count, error, metadata,
                  created_at, updated_at
        ",
    )
    .bind(event_id)
    .bind(event_type)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(format!("event {event_id} already claimed"));
        }
        RepositoryError::Database(e)
    })?;

    Ok(row)
}

/// Record the outcome of processing a claimed event.
///
/// `metadata` is merged into the existing JSONB value rather than replacing
/// it.
///
/// # Errors
///
/// Returns [`RepositoryError::NotFound`] if no row exists for `event_id`, or
/// error if the database update fails.
pub async fn record_outcome(
    pool: &PgPool,
    event_id: &str,
    success: bool,
    error: Option<&str>,
    metadata: &serde_json::Value,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE webhook_events
        SET success = $2,
            error = $3,
            metadata = metadata || $4,
            updated_at = NOW()
        WHERE event_id = $1
        ",
    )
    .bind(event_id)
    .bind(success)
    .bind(error)
    .bind(metadata)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Increment the redelivery counter for an already-claimed event.
///
/// `metadata` (last-retry timestamp, request ID) is merged into the existing
/// JSONB value. Returns the new counter value.
///
/// # Errors
///
/// Returns [`RepositoryError::NotFound`] if no row exists for `event_id`, or
/// error if the database update fails.
pub async fn bump_retry(
    pool: &PgPool,
    event_id: &str,
    metadata: &serde_json::Value,
) -> Result<i32, RepositoryError> {
    let retry_count = sqlx::query_scalar::<_, i32>(
        r"
        UPDATE webhook_events
        SET retry_count = retry_count + 1,
            metadata = metadata || $2,
            updated_at = NOW()
        WHERE event_id = $1
        RETURNING retry_count
        ",
    )
    .bind(event_id)
    .bind(metadata)
    .fetch_optional(pool)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    Ok(retry_count)
}
