//! Stripe webhook endpoint.
//!
//! The pipeline per delivery is fixed: verify the signature over the raw
//! bytes, parse the envelope, consult the idempotency ledger, claim the
//! event, dispatch, record the outcome, answer. Signature failures are
//! rejected before any state is written and never reach the ledger. Once an
//! outcome (including a handler failure) is recorded, the response is 200;
//! Stripe's retry machinery is driven by the ledger state, not the status
//! code. 500 is reserved for errors that left no record, where a redelivery
//! is the only path to recovery.

use std::time::Instant;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::db::{RepositoryError, webhook_events};
use crate::middleware::RequestId;
use crate::state::AppState;
use crate::stripe::StripeEvent;

/// Header carrying the provider's signature.
const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Create webhook routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/stripe", post(handle_stripe_webhook))
}

/// Acknowledgement body for deliveries whose outcome is recorded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookAck {
    received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    request_id: String,
    processing_time_ms: u64,
}

/// Rejection body for deliveries that never reached the ledger.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookRejection {
    error: String,
    request_id: String,
    processing_time_ms: u64,
}

/// Handle a webhook delivery from Stripe.
#[instrument(skip_all)]
async fn handle_stripe_webhook(
    State(state): State<AppState>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();

    // Signature first, over the raw bytes, before anything is parsed or
    // written
    let Some(signature) = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        warn!("Webhook delivery without signature header");
        return reject(
            StatusCode::BAD_REQUEST,
            "Missing stripe-signature header".to_string(),
            &request_id,
            started,
        );
    };

    if let Err(e) = state.verifier().verify(&body, signature) {
        warn!(error = %e, "Webhook signature verification failed");
        return reject(
            StatusCode::BAD_REQUEST,
            format!("Invalid signature: {e}"),
            &request_id,
            started,
        );
    }

    let event = match StripeEvent::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Webhook body is not a valid event envelope");
            return reject(
                StatusCode::BAD_REQUEST,
                format!("Invalid payload: {e}"),
                &request_id,
                started,
            );
        }
    };

    info!(event_id = %event.id, event_type = %event.event_type, livemode = event.livemode, "Webhook received");

    // Idempotency short-circuit: redeliveries of a recorded event only bump
    // a counter
    match webhook_events::find_by_event_id(state.pool(), &event.id).await {
        Ok(Some(existing)) => {
            let retry_metadata = last_retry_metadata(&request_id);
            match webhook_events::bump_retry(state.pool(), &event.id, &retry_metadata).await {
                Ok(retries) => info!(
                    event_id = %event.id,
                    retries,
                    prior_success = existing.success,
                    "Duplicate webhook delivery acknowledged"
                ),
                Err(e) => warn!(event_id = %event.id, error = %e, "Failed to bump retry counter"),
            }
            return ack(existing.error, &request_id, started);
        }
        Ok(None) => {}
        Err(e) => return ledger_unavailable(&e, &request_id, started),
    }

    // Claim the event; losing the insert race means a concurrent delivery of
    // the same event is already processing it
    match webhook_events::record_start(state.pool(), &event.id, &event.event_type).await {
        Ok(_) => {}
        Err(RepositoryError::Conflict(_)) => {
            info!(event_id = %event.id, "Lost claim race, acknowledging duplicate");
            let retry_metadata = last_retry_metadata(&request_id);
            if let Err(e) =
                webhook_events::bump_retry(state.pool(), &event.id, &retry_metadata).await
            {
                warn!(event_id = %event.id, error = %e, "Failed to bump retry counter");
            }
            return ack(None, &request_id, started);
        }
        Err(e) => return ledger_unavailable(&e, &request_id, started),
    }

    let outcome = state.processor().process(&event).await;

    let mut metadata = outcome.metadata;
    if let serde_json::Value::Object(ref mut map) = metadata {
        map.insert("requestId".to_string(), serde_json::json!(request_id));
        map.insert(
            "processingTimeMs".to_string(),
            serde_json::json!(elapsed_ms(started)),
        );
    }

    if let Err(e) = webhook_events::record_outcome(
        state.pool(),
        &event.id,
        outcome.success,
        outcome.error.as_deref(),
        &metadata,
    )
    .await
    {
        // The claim row exists, so a redelivery will short-circuit instead
        // of re-running the handler
        return ledger_unavailable(&e, &request_id, started);
    }

    ack(outcome.error, &request_id, started)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Ledger metadata recorded on each acknowledged redelivery.
fn last_retry_metadata(request_id: &str) -> serde_json::Value {
    serde_json::json!({
        "lastRetryAt": chrono::Utc::now().to_rfc3339(),
        "lastRetryRequestId": request_id,
    })
}

fn ack(error: Option<String>, request_id: &str, started: Instant) -> Response {
    (
        StatusCode::OK,
        Json(WebhookAck {
            received: true,
            error,
            request_id: request_id.to_string(),
            processing_time_ms: elapsed_ms(started),
        }),
    )
        .into_response()
}

fn reject(status: StatusCode, error: String, request_id: &str, started: Instant) -> Response {
    (
        status,
        Json(WebhookRejection {
            error,
            request_id: request_id.to_string(),
            processing_time_ms: elapsed_ms(started),
        }),
    )
        .into_response()
}

/// A ledger read or write failed before an outcome could be recorded; 500
/// tells the provider to redeliver.
fn ledger_unavailable(e: &RepositoryError, request_id: &str, started: Instant) -> Response {
    let event_id = sentry::capture_error(e);
    error!(error = %e, sentry_event_id = %event_id, "Event ledger unavailable");
    reject(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
        request_id,
        started,
    )
}
