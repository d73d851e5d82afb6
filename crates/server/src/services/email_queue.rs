//! Durable email queue with retry and dead-lettering.
//!
//! Enqueuing writes a row and kicks an immediate delivery pass; the caller
//! never waits on SMTP. Failed attempts are rescheduled with exponential
//! backoff ([`RetryPolicy`]), and entries that exhaust their attempts are
//! dead-lettered exactly once with their full history in the log. A periodic
//! scheduler re-scans for due work as a safety net, so retries survive
//! process restarts.

use std::time::Duration;

use chrono::{DateTime, Utc};
use salonkit_core::QueuedEmailId;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::db::email_queue::{self, EmailKind, EmailStatus, QueueCounts, QueuedEmailRow};
use crate::db::{RepositoryError, notifications};
use crate::services::mailer::{Mailer, OutboundEmail};
use crate::services::retry::RetryPolicy;

/// How many due entries one delivery pass claims.
const CLAIM_BATCH: i64 = 10;

/// Delivery attempts per entry before dead-lettering.
const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// How many entries the status listing returns.
const STATUS_LIST_LIMIT: i64 = 50;

/// Errors from queue operations.
#[derive(Debug, Error)]
pub enum EmailQueueError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Payload could not be serialized for storage.
    #[error("Payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Queue snapshot for the ops endpoint: counts plus a redacted listing.
///
/// Entries carry delivery bookkeeping only; stored payloads (recipient
/// addresses, names, login links) are never exposed here.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub counts: QueueCounts,
    pub recent: Vec<QueueEntrySummary>,
}

/// One redacted queue entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntrySummary {
    pub id: QueuedEmailId,
    pub kind: EmailKind,
    pub status: EmailStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<QueuedEmailRow> for QueueEntrySummary {
    fn from(row: QueuedEmailRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            status: row.status,
            attempts: row.attempts,
            max_attempts: row.max_attempts,
            last_error: row.last_error,
            next_attempt_at: row.next_attempt_at,
            created_at: row.created_at,
        }
    }
}

/// Email queue service.
#[derive(Clone)]
pub struct EmailQueue {
    pool: PgPool,
    mailer: Mailer,
    policy: RetryPolicy,
}

impl EmailQueue {
    #[must_use]
    pub const fn new(pool: PgPool, mailer: Mailer, policy: RetryPolicy) -> Self {
        Self {
            pool,
            mailer,
            policy,
        }
    }

    /// Enqueue an email and trigger an immediate delivery pass.
    ///
    /// The pass runs on a detached task; this call returns as soon as the row
    /// is durable and never waits on SMTP.
    ///
    /// # Errors
    ///
    /// Returns error if the payload cannot be serialized or the insert fails.
    pub async fn enqueue(&self, email: &OutboundEmail) -> Result<QueuedEmailId, EmailQueueError> {
        let payload = email.to_payload()?;
        let row =
            email_queue::enqueue(&self.pool, email.kind(), &payload, DEFAULT_MAX_ATTEMPTS).await?;

        info!(id = %row.id, kind = ?row.kind, "Email enqueued");

        let queue = self.clone();
        tokio::spawn(async move {
            queue.process_due().await;
        });

        Ok(row.id)
    }

    /// Claim and attempt delivery for all due entries.
    #[instrument(skip_all)]
    pub async fn process_due(&self) {
        let rows = match email_queue::claim_due(&self.pool, CLAIM_BATCH).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, "Failed to claim due emails");
                return;
            }
        };

        for row in rows {
            self.attempt(row).await;
        }
    }

    /// One delivery attempt for a claimed entry.
    async fn attempt(&self, row: QueuedEmailRow) {
        let outcome = match OutboundEmail::from_parts(row.kind, &row.payload) {
            Ok(email) => self.mailer.send(&email).await,
            Err(e) => Err(e.into()),
        };

        match outcome {
            Ok(()) => {
                if let Err(e) = email_queue::mark_sent(&self.pool, row.id).await {
                    error!(id = %row.id, error = %e, "Failed to mark email sent");
                } else {
                    info!(id = %row.id, kind = ?row.kind, attempts = row.attempts, "Email delivered");
                }
            }
            Err(send_err) => self.handle_failure(&row, &send_err.to_string()).await,
        }
    }

    async fn handle_failure(&self, row: &QueuedEmailRow, error_message: &str) {
        // `claim_due` already counted this attempt
        if row.attempts >= row.max_attempts {
            match email_queue::mark_failed(&self.pool, row.id, error_message).await {
                Ok(true) => self.dead_letter(row, error_message).await,
                Ok(false) => {}
                Err(e) => error!(id = %row.id, error = %e, "Failed to mark email failed"),
            }
            return;
        }

        let next_attempt_at = self
            .policy
            .next_attempt_at(Utc::now(), u32::try_from(row.attempts).unwrap_or(u32::MAX));
        match email_queue::mark_retry(&self.pool, row.id, next_attempt_at, error_message).await {
            Ok(()) => warn!(
                id = %row.id,
                kind = ?row.kind,
                attempts = row.attempts,
                max_attempts = row.max_attempts,
                %next_attempt_at,
                error = %error_message,
                "Email delivery failed, retry scheduled"
            ),
            Err(e) => error!(id = %row.id, error = %e, "Failed to schedule email retry"),
        }
    }

    /// Dead-letter path: emit the entry's full history so a failed email is
    /// never silently dropped, and raise an operator notification.
    async fn dead_letter(&self, row: &QueuedEmailRow, error_message: &str) {
        error!(
            id = %row.id,
            kind = ?row.kind,
            attempts = row.attempts,
            max_attempts = row.max_attempts,
            payload = %row.payload,
            error = %error_message,
            enqueued_at = %row.created_at,
            last_attempt_at = ?row.last_attempt_at,
            "Email permanently failed after exhausting retries"
        );

        // Best-effort: a notification failure must not mask the dead-letter
        let notification = notifications::NewNotification {
            account_id: None,
            title: "Email delivery failed".to_string(),
            message: format!(
                "A {:?} email failed permanently after {} attempts: {error_message}",
                row.kind, row.attempts
            ),
            category: "email".to_string(),
            priority: "high".to_string(),
            action_url: None,
            action_label: None,
            metadata: serde_json::json!({ "emailId": row.id, "kind": row.kind }),
        };
        if let Err(e) = notifications::create(&self.pool, notification).await {
            warn!(id = %row.id, error = %e, "Failed to create dead-letter notification");
        }
    }

    /// Counts by status plus a redacted listing of recent entries.
    ///
    /// # Errors
    ///
    /// Returns error if the database queries fail.
    pub async fn status(&self) -> Result<QueueStatus, RepositoryError> {
        let counts = email_queue::counts(&self.pool).await?;
        let recent = email_queue::recent(&self.pool, STATUS_LIST_LIMIT)
            .await?
            .into_iter()
            .map(QueueEntrySummary::from)
            .collect();

        Ok(QueueStatus { counts, recent })
    }

    /// Reset a dead-lettered entry and trigger an immediate delivery pass.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the entry does not exist or
    /// is not `failed`.
    pub async fn retry_failed(&self, id: QueuedEmailId) -> Result<(), RepositoryError> {
        email_queue::retry_failed(&self.pool, id).await?;
        info!(%id, "Failed email reset for retry");

        let queue = self.clone();
        tokio::spawn(async move {
            queue.process_due().await;
        });

        Ok(())
    }

    /// Garbage-collect sent entries.
    ///
    /// # Errors
    ///
    /// Returns error if the database delete fails.
    pub async fn purge_sent(&self) -> Result<u64, RepositoryError> {
        let removed = email_queue::purge_sent(&self.pool).await?;
        if removed > 0 {
            info!(removed, "Purged sent emails");
        }
        Ok(removed)
    }
}

/// Spawn the periodic queue scheduler.
///
/// Re-scans for due entries on a fixed interval. Immediate passes kicked by
/// `enqueue` handle the happy path; this loop is the safety net that picks up
/// scheduled retries and anything orphaned by a restart. The returned handle
/// lets the caller stop the loop once the server has drained.
pub fn spawn_scheduler(queue: EmailQueue, period: Duration) -> tokio::task::JoinHandle<()> {
    info!(period_secs = period.as_secs(), "Starting email queue scheduler");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately, which doubles as a startup sweep
        loop {
            ticker.tick().await;
            queue.process_due().await;
        }
    })
}
