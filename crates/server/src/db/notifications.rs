//! Database operations for in-app notifications.
//!
//! Notifications are advisory. Webhook handlers create them best-effort and
//! swallow failures, so a notification insert can never fail a checkout.

use salonkit_core::AccountId;
use sqlx::PgPool;

use super::RepositoryError;

/// Parameters for creating a notification.
pub struct NewNotification {
    /// Target account, or `None` for operator-facing notifications.
    pub account_id: Option<AccountId>,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Grouping key (`order`, `email`, `billing`, ...).
    pub category: String,
    /// `normal` or `high`.
    pub priority: String,
    /// Optional link target.
    pub action_url: Option<String>,
    /// Optional link label.
    pub action_label: Option<String>,
    /// Structured context for the notification.
    pub metadata: serde_json::Value,
}

/// Create a notification.
///
/// # Errors
///
/// Returns error if the database insert fails.
pub async fn create(pool: &PgPool, params: NewNotification) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO notifications (
            account_id, title, message, category, priority,
            action_url, action_label, metadata
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ",
    )
    .bind(params.account_id)
    .bind(&params.title)
    .bind(&params.message)
    .bind(&params.category)
    .bind(&params.priority)
    .bind(params.action_url.as_deref())
    .bind(params.action_label.as_deref())
    .bind(&params.metadata)
    .execute(pool)
    .await?;

    Ok(())
}
