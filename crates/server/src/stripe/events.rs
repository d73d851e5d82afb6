//! Stripe webhook event envelope and payload models.
//!
//! Events arrive as a generic envelope whose `data.object` shape depends on
//! the `type` tag. [`StripeEvent::kind`] narrows the envelope into the closed
//! [`WebhookEventKind`] union, so handler code never touches raw JSON and
//! unknown types stay explicit instead of falling through a string match.

use serde::Deserialize;
use thiserror::Error;

/// The outer webhook envelope, common to every event type.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    /// Provider-assigned event ID (`evt_...`), the idempotency key.
    pub id: String,
    /// Event type tag (`checkout.session.completed`, ...).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Unix timestamp the event was created at.
    #[serde(default)]
    pub created: i64,
    /// Whether the event originated in live mode.
    #[serde(default)]
    pub livemode: bool,
    /// Type-dependent payload.
    pub data: EventData,
}

/// Container for the type-dependent payload object.
#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Error narrowing an envelope into a typed payload.
#[derive(Debug, Error)]
#[error("Malformed {event_type} payload: {source}")]
pub struct EventParseError {
    pub event_type: String,
    #[source]
    pub source: serde_json::Error,
}

/// The closed set of event kinds this pipeline understands.
///
/// Anything else lands in `Unhandled`, which handlers acknowledge without
/// side effects.
#[derive(Debug, Clone)]
pub enum WebhookEventKind {
    /// `checkout.session.completed`; triggers fulfillment.
    CheckoutCompleted(CheckoutSession),
    /// `payment_intent.succeeded`; best-effort payment bookkeeping.
    PaymentSucceeded(PaymentIntent),
    /// `payment_intent.payment_failed`; payment + order cancellation.
    PaymentFailed(PaymentIntent),
    /// `invoice.payment_succeeded`; reserved for recurring billing.
    InvoicePaymentSucceeded,
    /// `customer.subscription.created`; reserved for recurring billing.
    SubscriptionCreated,
    /// Any other type; acknowledged without side effects.
    Unhandled(String),
}

impl StripeEvent {
    /// Parse a raw webhook body into the envelope.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error if the body is not a valid
    /// envelope.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Narrow the envelope into a typed event kind.
    ///
    /// # Errors
    ///
    /// Returns [`EventParseError`] if `data.object` does not match the shape
    /// the type tag promises. Unknown type tags are not an error.
    pub fn kind(&self) -> Result<WebhookEventKind, EventParseError> {
        let parse_err = |source| EventParseError {
            event_type: self.event_type.clone(),
            source,
        };

        match self.event_type.as_str() {
            "checkout.session.completed" => {
                let session = CheckoutSession::deserialize(&self.data.object).map_err(parse_err)?;
                Ok(WebhookEventKind::CheckoutCompleted(session))
            }
            "payment_intent.succeeded" => {
                let intent = PaymentIntent::deserialize(&self.data.object).map_err(parse_err)?;
                Ok(WebhookEventKind::PaymentSucceeded(intent))
            }
            "payment_intent.payment_failed" => {
                let intent = PaymentIntent::deserialize(&self.data.object).map_err(parse_err)?;
                Ok(WebhookEventKind::PaymentFailed(intent))
            }
            "invoice.payment_succeeded" => Ok(WebhookEventKind::InvoicePaymentSucceeded),
            "customer.subscription.created" => Ok(WebhookEventKind::SubscriptionCreated),
            other => Ok(WebhookEventKind::Unhandled(other.to_string())),
        }
    }
}

/// A `checkout.session` object as delivered in webhook payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Provider-assigned session ID (`cs_...`), the natural key for orders.
    pub id: String,
    /// Total charged, in the currency's minor unit (cents).
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// Lowercase ISO currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// `paid`, `unpaid`, or `no_payment_required`.
    #[serde(default)]
    pub payment_status: String,
    /// Associated payment intent ID (`pi_...`), if one exists.
    #[serde(default)]
    pub payment_intent: Option<String>,
    /// Merchant-supplied metadata attached at session creation.
    #[serde(default)]
    pub metadata: SessionMetadata,
}

impl CheckoutSession {
    /// Whether the session was actually paid. Fulfillment only runs for paid
    /// sessions; `no_payment_required` and `unpaid` are skipped.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// Metadata our checkout page attaches to every session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
}

impl SessionMetadata {
    /// Names of required fields that are missing or blank.
    ///
    /// Fulfillment refuses to run unless this is empty; an empty return means
    /// email, name, and business name are all present.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(self.customer_email.as_deref()) {
            missing.push("customer_email");
        }
        if is_blank(self.customer_name.as_deref()) {
            missing.push("customer_name");
        }
        if is_blank(self.business_name.as_deref()) {
            missing.push("business_name");
        }
        missing
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// A `payment_intent` object as delivered in webhook payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    /// Provider-assigned intent ID (`pi_...`).
    pub id: String,
    /// Amount in the currency's minor unit.
    #[serde(default)]
    pub amount: i64,
    /// Lowercase ISO currency code.
    #[serde(default)]
    pub currency: Option<String>,
    /// Populated on `payment_intent.payment_failed`.
    #[serde(default)]
    pub last_payment_error: Option<LastPaymentError>,
}

/// The failure detail attached to a failed payment intent.
#[derive(Debug, Clone, Deserialize)]
pub struct LastPaymentError {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn checkout_completed_body() -> &'static str {
        r#"{
            "id": "evt_1PXYZCheckout",
            "object": "event",
            "type": "checkout.session.completed",
            "created": 1719858000,
            "livemode": false,
            "data": {
                "object": {
                    "id": "cs_test_a1b2c3",
                    "object": "checkout.session",
                    "amount_total": 19900,
                    "currency": "eur",
                    "payment_status": "paid",
                    "payment_intent": "pi_3PXYZ",
                    "metadata": {
                        "customer_email": "Anna@Salon-Muster.de",
                        "customer_name": "Anna Muster",
                        "business_name": "Salon Muster",
                        "phone": "+49 30 1234567",
                        "business_type": "salon"
                    }
                }
            }
        }"#
    }

    #[test]
    fn test_parse_checkout_completed_envelope() {
        let event = StripeEvent::from_slice(checkout_completed_body().as_bytes()).unwrap();
        assert_eq!(event.id, "evt_1PXYZCheckout");
        assert_eq!(event.event_type, "checkout.session.completed");
        assert!(!event.livemode);

        let WebhookEventKind::CheckoutCompleted(session) = event.kind().unwrap() else {
            panic!("expected checkout kind");
        };
        assert_eq!(session.id, "cs_test_a1b2c3");
        assert_eq!(session.amount_total, Some(19900));
        assert_eq!(session.currency.as_deref(), Some("eur"));
        assert!(session.is_paid());
        assert_eq!(session.payment_intent.as_deref(), Some("pi_3PXYZ"));
        assert!(session.metadata.missing_required().is_empty());
    }

    #[test]
    fn test_unpaid_session_is_not_paid() {
        let session: CheckoutSession = serde_json::from_str(
            r#"{"id": "cs_1", "payment_status": "no_payment_required"}"#,
        )
        .unwrap();
        assert!(!session.is_paid());

        let session: CheckoutSession =
            serde_json::from_str(r#"{"id": "cs_2", "payment_status": "unpaid"}"#).unwrap();
        assert!(!session.is_paid());
    }

    #[test]
    fn test_missing_metadata_fields_are_reported() {
        let session: CheckoutSession = serde_json::from_str(
            r#"{
                "id": "cs_3",
                "payment_status": "paid",
                "metadata": {"customer_email": "owner@salon.example", "customer_name": "  "}
            }"#,
        )
        .unwrap();

        let missing = session.metadata.missing_required();
        assert_eq!(missing, vec!["customer_name", "business_name"]);
    }

    #[test]
    fn test_absent_metadata_reports_all_required_fields() {
        let session: CheckoutSession =
            serde_json::from_str(r#"{"id": "cs_4", "payment_status": "paid"}"#).unwrap();

        assert_eq!(
            session.metadata.missing_required(),
            vec!["customer_email", "customer_name", "business_name"]
        );
    }

    #[test]
    fn test_parse_payment_failed_with_error_message() {
        let event = StripeEvent::from_slice(
            br#"{
                "id": "evt_2Fail",
                "type": "payment_intent.payment_failed",
                "created": 1719858100,
                "data": {
                    "object": {
                        "id": "pi_3Declined",
                        "amount": 19900,
                        "currency": "eur",
                        "last_payment_error": {"message": "Your card was declined."}
                    }
                }
            }"#,
        )
        .unwrap();

        let WebhookEventKind::PaymentFailed(intent) = event.kind().unwrap() else {
            panic!("expected payment failed kind");
        };
        assert_eq!(intent.id, "pi_3Declined");
        assert_eq!(
            intent.last_payment_error.unwrap().message.as_deref(),
            Some("Your card was declined.")
        );
    }

    #[test]
    fn test_unknown_event_type_is_unhandled() {
        let event = StripeEvent::from_slice(
            br#"{"id": "evt_3", "type": "charge.refunded", "data": {"object": {}}}"#,
        )
        .unwrap();

        let WebhookEventKind::Unhandled(tag) = event.kind().unwrap() else {
            panic!("expected unhandled kind");
        };
        assert_eq!(tag, "charge.refunded");
    }

    #[test]
    fn test_billing_events_parse_without_payload_models() {
        let invoice = StripeEvent::from_slice(
            br#"{"id": "evt_4", "type": "invoice.payment_succeeded", "data": {"object": {"id": "in_1"}}}"#,
        )
        .unwrap();
        assert!(matches!(
            invoice.kind().unwrap(),
            WebhookEventKind::InvoicePaymentSucceeded
        ));

        let subscription = StripeEvent::from_slice(
            br#"{"id": "evt_5", "type": "customer.subscription.created", "data": {"object": {"id": "sub_1"}}}"#,
        )
        .unwrap();
        assert!(matches!(
            subscription.kind().unwrap(),
            WebhookEventKind::SubscriptionCreated
        ));
    }

    #[test]
    fn test_mismatched_payload_shape_is_an_error() {
        // A checkout tag with a payload missing the session id
        let event = StripeEvent::from_slice(
            br#"{"id": "evt_6", "type": "checkout.session.completed", "data": {"object": {"amount_total": 100}}}"#,
        )
        .unwrap();

        let err = event.kind().unwrap_err();
        assert_eq!(err.event_type, "checkout.session.completed");
    }
}
