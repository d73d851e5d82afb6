//! Database operations for orders.
//!
//! Orders are created inside the fulfillment transaction; the only later
//! lifecycle change driven by webhooks is cancellation when the underlying
//! payment fails.

use sqlx::PgPool;

use super::RepositoryError;

/// Cancel all orders tied to a payment intent.
///
/// Returns how many orders were cancelled. Already-cancelled orders are left
/// untouched so redeliveries are no-ops.
///
/// # Errors
///
/// Returns error if the database update fails.
pub async fn cancel_by_payment_intent(
    pool: &PgPool,
    payment_intent_id: &str,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE orders
        SET status = 'cancelled',
            updated_at = NOW()
        WHERE payment_intent_id = $1
          AND status <> 'cancelled'
        ",
    )
    .bind(payment_intent_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
