//! Database operations for payment records.
//!
//! Payments are created inside the fulfillment transaction; the functions
//! here handle the later lifecycle updates driven by payment-intent webhooks.
//! Both are keyed by the provider's `payment_intent_id` and return the row
//! count so callers can tell an orphaned intent (0 rows) from a real update.

use sqlx::PgPool;

use super::RepositoryError;

/// Mark payments for a payment intent as completed.
///
/// Idempotent: rows already `completed` are left untouched, so a webhook
/// redelivery does not move `paid_at`.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn mark_completed_by_intent(
    pool: &PgPool,
    payment_intent_id: &str,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE payments
        SET status = 'completed',
            paid_at = NOW(),
            updated_at = NOW()
        WHERE payment_intent_id = $1
          AND status <> 'completed'
        ",
    )
    .bind(payment_intent_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Mark payments for a payment intent as failed, recording the provider's
/// failure message.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn mark_failed_by_intent(
    pool: &PgPool,
    payment_intent_id: &str,
    failure_message: Option<&str>,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE payments
        SET status = 'failed',
            failed_at = NOW(),
            failure_message = $2,
            updated_at = NOW()
        WHERE payment_intent_id = $1
          AND status <> 'failed'
        ",
    )
    .bind(payment_intent_id)
    .bind(failure_message)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
