//! Database operations for the durable email queue.
//!
//! Rows move `pending -> processing -> sent | pending (retry) | failed`.
//! Every transition out of `processing` is guarded by a status check in the
//! `WHERE` clause, so concurrent workers cannot double-apply an outcome, and
//! [`claim_due`] uses `FOR UPDATE SKIP LOCKED` so two schedulers never claim
//! the same row.

use chrono::{DateTime, Utc};
use salonkit_core::QueuedEmailId;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// Delivery status of a queued email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(type_name = "email_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Pending,
    Processing,
    Sent,
    Failed,
}

/// Kind of transactional email, mapped to a template pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(type_name = "email_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EmailKind {
    Welcome,
    Receipt,
}

/// A queued email row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueuedEmailRow {
    /// Queue entry ID.
    pub id: QueuedEmailId,
    /// Which template pair to render.
    pub kind: EmailKind,
    /// Serialized template payload (recipient, names, links).
    pub payload: serde_json::Value,
    /// Current delivery status.
    pub status: EmailStatus,
    /// Send attempts so far.
    pub attempts: i32,
    /// Attempts after which the row is dead-lettered.
    pub max_attempts: i32,
    /// Error from the most recent failed attempt.
    pub last_error: Option<String>,
    /// When the most recent attempt started.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Earliest time the next attempt may run.
    pub next_attempt_at: DateTime<Utc>,
    /// When the email was enqueued.
    pub created_at: DateTime<Utc>,
    /// When the row was last touched.
    pub updated_at: DateTime<Utc>,
}

/// Per-status row counts for the queue.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QueueCounts {
    pub pending: i64,
    pub processing: i64,
    pub sent: i64,
    pub failed: i64,
}

/// Enqueue an email for delivery.
///
/// The row starts `pending` with `next_attempt_at = NOW()`, so it is eligible
/// for the next scheduler pass immediately.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn enqueue(
    pool: &PgPool,
    kind: EmailKind,
    payload: &serde_json::Value,
    max_attempts: i32,
) -> Result<QueuedEmailRow, RepositoryError> {
    let row = sqlx::query_as::<_, QueuedEmailRow>(
        r"
        INSERT INTO email_queue (kind, payload, max_attempts)
        VALUES ($1, $2, $3)
        RETURNING id, kind, payload, status, attempts, max_attempts, last_error,
                  last_attempt_at, next_attempt_at, created_at, updated_at
        ",
    )
    .bind(kind)
    .bind(payload)
    .bind(max_attempts)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Claim due pending emails for delivery.
///
/// Moves up to `limit` rows whose `next_attempt_at` has passed into
/// `processing` and increments their attempt counter. Rows that have already
/// used up their attempts are skipped rather than claimed, and `FOR UPDATE
/// SKIP LOCKED` keeps concurrent schedulers from claiming the same row.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn claim_due(pool: &PgPool, limit: i64) -> Result<Vec<QueuedEmailRow>, RepositoryError> {
    let rows = sqlx::query_as::<_, QueuedEmailRow>(
        r"
        UPDATE email_queue
        SET status = 'processing',
            attempts = attempts + 1,
            last_attempt_at = NOW(),
            updated_at = NOW()
        WHERE id IN (
            SELECT id FROM email_queue
            WHERE status = 'pending'
              AND next_attempt_at <= NOW()
              AND attempts < max_attempts
            ORDER BY next_attempt_at
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING id, kind, payload, status, attempts, max_attempts, last_error,
                  last_attempt_at, next_attempt_at, created_at, updated_at
        ",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Mark a processing email as sent.
///
/// # Errors
///
/// Returns [`RepositoryError::NotFound`] if the row is not in `processing`,
/// or error if the database update fails.
pub async fn mark_sent(pool: &PgPool, id: QueuedEmailId) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE email_queue
        SET status = 'sent',
            last_error = NULL,
            updated_at = NOW()
        WHERE id = $1 AND status = 'processing'
        ",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Return a processing email to `pending` for a later retry.
///
/// # Errors
///
/// Returns [`RepositoryError::NotFound`] if the row is not in `processing`,
/// or error if the database update fails.
pub async fn mark_retry(
    pool: &PgPool,
    id: QueuedEmailId,
    next_attempt_at: DateTime<Utc>,
    error: &str,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE email_queue
        SET status = 'pending',
            last_error = $3,
            next_attempt_at = $2,
            updated_at = NOW()
        WHERE id = $1 AND status = 'processing'
        ",
    )
    .bind(id)
    .bind(next_attempt_at)
    .bind(error)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Dead-letter a processing email after its final attempt.
///
/// Returns `true` if this call performed the transition. The status guard
/// means exactly one caller ever sees `true` per row, which is what keeps the
/// dead-letter alert from firing twice.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn mark_failed(
    pool: &PgPool,
    id: QueuedEmailId,
    error: &str,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE email_queue
        SET status = 'failed',
            last_error = $2,
            updated_at = NOW()
        WHERE id = $1 AND status = 'processing'
        ",
    )
    .bind(id)
    .bind(error)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Reset a dead-lettered email for another round of attempts.
///
/// # Errors
///
/// Returns [`RepositoryError::NotFound`] if the row does not exist or is not
/// `failed`, or error if the database update fails.
pub async fn retry_failed(pool: &PgPool, id: QueuedEmailId) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE email_queue
        SET status = 'pending',
            attempts = 0,
            last_error = NULL,
            next_attempt_at = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status = 'failed'
        ",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

/// Count queue rows by status.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn counts(pool: &PgPool) -> Result<QueueCounts, RepositoryError> {
    let rows = sqlx::query_as::<_, (EmailStatus, i64)>(
        r"
        SELECT status, COUNT(*)
        FROM email_queue
        GROUP BY status
        ",
    )
    .fetch_all(pool)
    .await?;

    let mut counts = QueueCounts::default();
    for (status, count) in rows {
        match status {
            EmailStatus::Pending => counts.pending = count,
            EmailStatus::Processing => counts.processing = count,
            EmailStatus::Sent => counts.sent = count,
            EmailStatus::Failed => counts.failed = count,
        }
    }

    Ok(counts)
}

/// List the most recently enqueued emails.
///
/// # Errors
///
/// Returns error if the database query fails.
pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<QueuedEmailRow>, RepositoryError> {
    let rows = sqlx::query_as::<_, QueuedEmailRow>(
        r"
        SELECT id, kind, payload, status, attempts, max_attempts, last_error,
               last_attempt_at, next_attempt_at, created_at, updated_at
        FROM email_queue
        ORDER BY created_at DESC
        LIMIT $1
        ",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete all sent rows, returning how many were removed.
///
/// # Errors
///
/// Returns error if the database delete fails.
pub async fn purge_sent(pool: &PgPool) -> Result<u64, RepositoryError> {
    let result = sqlx::query("DELETE FROM email_queue WHERE status = 'sent'")
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
