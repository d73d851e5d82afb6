//! Ops endpoints for the email queue, plus a gated checkout simulator.
//!
//! These sit behind the deployment's network boundary (internal port /
//! Tailscale), not product auth.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use salonkit_core::QueuedEmailId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::services::email_queue::QueueStatus;
use crate::services::fulfillment::{FulfillmentError, FulfillmentOutcome};
use crate::state::AppState;
use crate::stripe::{CheckoutSession, SessionMetadata};

/// Create ops routes. The checkout simulator is only registered when test
/// endpoints are enabled, so it 404s like any unknown path in production.
pub fn router(config: &ServerConfig) -> Router<AppState> {
    let mut router = Router::new()
        .route("/admin/emails/queue", get(queue_status))
        .route("/admin/emails/{id}/retry", post(retry_email))
        .route("/admin/emails/sent", delete(purge_sent));

    if config.enable_test_endpoints {
        router = router.route("/admin/test/checkout", post(simulate_checkout));
    }

    router
}

/// Queue counts and a redacted listing of recent entries.
async fn queue_status(State(state): State<AppState>) -> Result<Json<QueueStatus>> {
    let status = state.email_queue().status().await?;
    Ok(Json(status))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RetryResponse {
    id: QueuedEmailId,
    status: &'static str,
}

/// Reset a dead-lettered email and trigger delivery.
async fn retry_email(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RetryResponse>> {
    let id = QueuedEmailId::new(id);
    state
        .email_queue()
        .retry_failed(id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::NotFound(format!("failed email {id} does not exist"))
            }
            other => AppError::Database(other),
        })?;

    Ok(Json(RetryResponse {
        id,
        status: "pending",
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PurgeResponse {
    removed: u64,
}

/// Garbage-collect sent queue entries.
async fn purge_sent(State(state): State<AppState>) -> Result<Json<PurgeResponse>> {
    let removed = state.email_queue().purge_sent().await?;
    Ok(Json(PurgeResponse { removed }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulateCheckoutRequest {
    email: String,
    name: String,
    business_name: String,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    business_type: Option<String>,
    #[serde(default = "default_amount_cents")]
    amount_cents: i64,
    #[serde(default = "default_currency")]
    currency: String,
}

const fn default_amount_cents() -> i64 {
    19900
}

fn default_currency() -> String {
    "eur".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateCheckoutResponse {
    checkout_session_id: String,
    order_id: salonkit_core::OrderId,
    account_id: salonkit_core::AccountId,
    created_account: bool,
    amount: String,
    login_url: String,
    token_expires_at: DateTime<Utc>,
}

/// Run fulfillment against a synthesized paid session, without touching
/// Stripe or the event ledger. Follow-up email delivery is exercised
/// separately via the queue endpoints.
async fn simulate_checkout(
    State(state): State<AppState>,
    Json(request): Json<SimulateCheckoutRequest>,
) -> Result<Json<SimulateCheckoutResponse>> {
    let session = CheckoutSession {
        id: format!("cs_test_{}", Uuid::new_v4().simple()),
        amount_total: Some(request.amount_cents),
        currency: Some(request.currency),
        payment_status: "paid".to_string(),
        payment_intent: Some(format!("pi_test_{}", Uuid::new_v4().simple())),
        metadata: SessionMetadata {
            customer_email: Some(request.email),
            customer_name: Some(request.name),
            business_name: Some(request.business_name),
            phone: request.phone,
            business_type: request.business_type,
        },
    };

    let outcome = state
        .fulfillment()
        .fulfill_checkout(&session)
        .await
        .map_err(map_fulfillment_error)?;

    match outcome {
        FulfillmentOutcome::Completed(fulfillment) => {
            let login_url = format!(
                "{}/auth/auto-login?token={}",
                state.config().base_url.trim_end_matches('/'),
                fulfillment.login_token
            );
            Ok(Json(SimulateCheckoutResponse {
                checkout_session_id: fulfillment.checkout_session_id,
                order_id: fulfillment.order_id,
                account_id: fulfillment.account_id,
                created_account: fulfillment.created_account,
                amount: fulfillment.amount.to_string(),
                login_url,
                token_expires_at: fulfillment.token_expires_at,
            }))
        }
        // Unreachable: the synthesized session is always "paid"
        FulfillmentOutcome::Skipped { reason } => Err(AppError::Internal(reason)),
    }
}

fn map_fulfillment_error(e: FulfillmentError) -> AppError {
    match e {
        FulfillmentError::MissingMetadata(_)
        | FulfillmentError::MissingAmount(_)
        | FulfillmentError::Amount(_)
        | FulfillmentError::Email(_)
        | FulfillmentError::Conflict(_) => AppError::BadRequest(e.to_string()),
        FulfillmentError::Database(db) => AppError::Database(RepositoryError::Database(db)),
        FulfillmentError::CredentialHash => AppError::Internal(e.to_string()),
    }
}
