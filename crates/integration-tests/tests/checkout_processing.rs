//! Event dispatch tests over the pre-database paths.
//!
//! These run the real [`WebhookProcessor`] wired to a pool that never
//! connects. Most branches covered here must reach their outcome before any
//! query runs; a database touch would surface as a connection error in the
//! outcome and fail the assertion. The payment-intent tests invert that:
//! they use the guaranteed connection error to pin down which branches
//! swallow storage trouble and which report it.
//!
//! [`WebhookProcessor`]: salonkit_server::services::webhooks::WebhookProcessor

use salonkit_integration_tests::{checkout_completed_body, processor};
use salonkit_server::stripe::StripeEvent;

fn event_from(body: &str) -> StripeEvent {
    StripeEvent::from_slice(body.as_bytes()).expect("fixture parses")
}

// =============================================================================
// Acknowledged Without Side Effects
// =============================================================================

#[tokio::test]
async fn test_unhandled_event_type_is_acknowledged() {
    let event = event_from(
        r#"{"id": "evt_p_refund", "type": "charge.refunded", "data": {"object": {"id": "ch_1"}}}"#,
    );

    let outcome = processor().process(&event).await;
    assert!(outcome.success);
    assert!(outcome.error.is_none());
}

#[tokio::test]
async fn test_billing_events_are_acknowledged() {
    for body in [
        r#"{"id": "evt_p_inv", "type": "invoice.payment_succeeded", "data": {"object": {"id": "in_1"}}}"#,
        r#"{"id": "evt_p_sub", "type": "customer.subscription.created", "data": {"object": {"id": "sub_1"}}}"#,
    ] {
        let outcome = processor().process(&event_from(body)).await;
        assert!(outcome.success, "event should be acknowledged: {body}");
        assert!(outcome.error.is_none());
    }
}

// =============================================================================
// Failures Become Outcomes, Never Panics
// =============================================================================

#[tokio::test]
async fn test_payload_not_matching_its_type_tag_is_a_recorded_failure() {
    // A checkout tag whose payload lacks the session id
    let event = event_from(
        r#"{"id": "evt_p_shape", "type": "checkout.session.completed", "data": {"object": {"amount_total": 100}}}"#,
    );

    let outcome = processor().process(&event).await;
    assert!(!outcome.success);
    let error = outcome.error.expect("failure carries an error");
    assert!(
        error.contains("checkout.session.completed"),
        "error should name the event type: {error}"
    );
}

#[tokio::test]
async fn test_missing_metadata_is_a_recorded_failure_naming_the_fields() {
    // Fixture bodies serialize compactly with keys in alphabetical order
    let body = checkout_completed_body("evt_p_meta", "paid")
        .replace(r#""customer_name":"Anna Muster","#, "")
        .replace(r#""business_name":"Salon Muster","#, "");
    assert!(!body.contains("Anna Muster"), "fields must be stripped");

    let outcome = processor().process(&event_from(&body)).await;
    assert!(!outcome.success);
    let error = outcome.error.expect("failure carries an error");
    assert!(error.contains("customer_name"), "got: {error}");
    assert!(error.contains("business_name"), "got: {error}");
}

#[tokio::test]
async fn test_negative_amount_is_a_recorded_failure() {
    let body = checkout_completed_body("evt_p_neg", "paid").replace("19900", "-19900");

    let outcome = processor().process(&event_from(&body)).await;
    assert!(!outcome.success);
    assert!(outcome.error.is_some());
}

// =============================================================================
// Unpaid Sessions
// =============================================================================

#[tokio::test]
async fn test_unpaid_checkout_is_skipped_successfully() {
    let body = checkout_completed_body("evt_p_unpaid", "unpaid");

    let outcome = processor().process(&event_from(&body)).await;
    assert!(outcome.success, "a skip is a recorded success");
    assert!(outcome.error.is_none());
    assert_eq!(
        outcome.metadata.get("skipped"),
        Some(&serde_json::json!(true))
    );
    assert!(
        outcome
            .metadata
            .get("reason")
            .and_then(|v| v.as_str())
            .expect("skip carries a reason")
            .contains("unpaid")
    );
}

#[tokio::test]
async fn test_no_payment_required_checkout_is_skipped_successfully() {
    let body = checkout_completed_body("evt_p_free", "no_payment_required");

    let outcome = processor().process(&event_from(&body)).await;
    assert!(outcome.success);
    assert_eq!(
        outcome.metadata.get("skipped"),
        Some(&serde_json::json!(true))
    );
}

// =============================================================================
// Payment Intent Branches
// =============================================================================

#[tokio::test]
async fn test_payment_succeeded_bookkeeping_is_best_effort() {
    // The bookkeeping update hits the unreachable database and errors, but a
    // succeeded intent may belong to a flow outside this pipeline. The
    // outcome stays successful so the provider does not redeliver.
    let event = event_from(
        r#"{"id": "evt_p_paid", "type": "payment_intent.succeeded", "data": {"object": {"id": "pi_p_1", "amount": 19900}}}"#,
    );

    let outcome = processor().process(&event).await;
    assert!(outcome.success, "bookkeeping trouble must not fail the event");
    assert!(outcome.error.is_none());
    assert_eq!(
        outcome.metadata.get("updatedPayments"),
        Some(&serde_json::json!(0))
    );
}

#[tokio::test]
async fn test_payment_failure_that_cannot_be_recorded_is_a_failure() {
    // Unlike the succeeded branch, a declined payment that cannot be written
    // through must surface as a failure so the provider retries it.
    let event = event_from(
        r#"{"id": "evt_p_declined", "type": "payment_intent.payment_failed", "data": {"object": {"id": "pi_p_2", "amount": 19900, "last_payment_error": {"message": "Your card was declined."}}}}"#,
    );

    let outcome = processor().process(&event).await;
    assert!(!outcome.success);
    assert!(outcome.error.is_some());
}
