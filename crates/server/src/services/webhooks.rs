//! Webhook event processing.
//!
//! [`WebhookProcessor::process`] routes a verified, de-duplicated event to
//! exactly one handler and reduces whatever happened to a [`ProcessOutcome`].
//! It never returns an error: every failure becomes a recorded outcome so the
//! caller can always write the ledger and answer the provider.

use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::db::{notifications, orders, payments};
use crate::services::email_queue::EmailQueue;
use crate::services::fulfillment::{Fulfillment, FulfillmentOutcome, FulfillmentService};
use crate::services::mailer::{OutboundEmail, ReceiptEmail, WelcomeEmail};
use crate::stripe::{PaymentIntent, StripeEvent, WebhookEventKind};

/// Uniform result of processing one event, recorded into the ledger.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub metadata: serde_json::Value,
}

impl ProcessOutcome {
    fn success(metadata: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            metadata,
        }
    }

    fn failure(error: String, metadata: serde_json::Value) -> Self {
        Self {
            success: false,
            error: Some(error),
            metadata,
        }
    }

    fn acknowledged() -> Self {
        Self::success(serde_json::json!({}))
    }
}

/// Routes events to handlers and owns the follow-up side effects.
#[derive(Clone)]
pub struct WebhookProcessor {
    pool: PgPool,
    fulfillment: FulfillmentService,
    email_queue: EmailQueue,
    base_url: String,
}

impl WebhookProcessor {
    #[must_use]
    pub fn new(
        pool: PgPool,
        fulfillment: FulfillmentService,
        email_queue: EmailQueue,
        base_url: String,
    ) -> Self {
        Self {
            pool,
            fulfillment,
            email_queue,
            base_url,
        }
    }

    /// Process one verified event.
    ///
    /// Exactly one branch runs per event; each reduces to a
    /// [`ProcessOutcome`] and a thrown error anywhere inside a branch becomes
    /// a failure outcome rather than propagating.
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn process(&self, event: &StripeEvent) -> ProcessOutcome {
        let kind = match event.kind() {
            Ok(kind) => kind,
            Err(e) => {
                warn!(error = %e, "Webhook payload did not match its type tag");
                return ProcessOutcome::failure(e.to_string(), serde_json::json!({}));
            }
        };

        match kind {
            WebhookEventKind::CheckoutCompleted(session) => self.handle_checkout(&session).await,
            WebhookEventKind::PaymentSucceeded(intent) => {
                self.handle_payment_succeeded(&intent).await
            }
            WebhookEventKind::PaymentFailed(intent) => self.handle_payment_failed(&intent).await,
            WebhookEventKind::InvoicePaymentSucceeded => {
                info!("Invoice payment acknowledged (recurring billing not yet handled)");
                ProcessOutcome::acknowledged()
            }
            WebhookEventKind::SubscriptionCreated => {
                info!("Subscription created acknowledged (recurring billing not yet handled)");
                ProcessOutcome::acknowledged()
            }
            WebhookEventKind::Unhandled(tag) => {
                info!(event_type = %tag, "Ignoring unhandled webhook event type");
                ProcessOutcome::acknowledged()
            }
        }
    }

    async fn handle_checkout(&self, session: &crate::stripe::CheckoutSession) -> ProcessOutcome {
        match self.fulfillment.fulfill_checkout(session).await {
            Ok(FulfillmentOutcome::Completed(fulfillment)) => {
                self.enqueue_fulfillment_emails(&fulfillment).await;
                self.notify_new_sale(&fulfillment).await;

                ProcessOutcome::success(serde_json::json!({
                    "orderId": fulfillment.order_id,
                    "accountId": fulfillment.account_id,
                    "paymentId": fulfillment.payment_id,
                    "amount": fulfillment.amount.to_string(),
                    "createdAccount": fulfillment.created_account,
                }))
            }
            Ok(FulfillmentOutcome::Skipped { reason }) => ProcessOutcome::success(
                serde_json::json!({ "skipped": true, "reason": reason }),
            ),
            Err(e) => ProcessOutcome::failure(e.to_string(), serde_json::json!({})),
        }
    }

    /// Best-effort bookkeeping: a payment intent with no matching record may
    /// belong to a flow outside this pipeline, so nothing here is fatal.
    async fn handle_payment_succeeded(&self, intent: &PaymentIntent) -> ProcessOutcome {
        match payments::mark_completed_by_intent(&self.pool, &intent.id).await {
            Ok(0) => {
                warn!(payment_intent_id = %intent.id, "Payment succeeded for unknown payment record");
                ProcessOutcome::success(serde_json::json!({ "updatedPayments": 0 }))
            }
            Ok(updated) => {
                info!(payment_intent_id = %intent.id, updated, "Marked payments completed");
                ProcessOutcome::success(serde_json::json!({ "updatedPayments": updated }))
            }
            Err(e) => {
                warn!(payment_intent_id = %intent.id, error = %e, "Failed to mark payments completed");
                ProcessOutcome::success(serde_json::json!({ "updatedPayments": 0 }))
            }
        }
    }

    async fn handle_payment_failed(&self, intent: &PaymentIntent) -> ProcessOutcome {
        let failure_message = intent
            .last_payment_error
            .as_ref()
            .and_then(|e| e.message.as_deref());

        let failed =
            match payments::mark_failed_by_intent(&self.pool, &intent.id, failure_message).await {
                Ok(count) => count,
                Err(e) => {
                    return ProcessOutcome::failure(e.to_string(), serde_json::json!({}));
                }
            };

        let cancelled = match orders::cancel_by_payment_intent(&self.pool, &intent.id).await {
            Ok(count) => count,
            Err(e) => {
                return ProcessOutcome::failure(
                    e.to_string(),
                    serde_json::json!({ "failedPayments": failed }),
                );
            }
        };

        info!(
            payment_intent_id = %intent.id,
            failed,
            cancelled,
            "Payment failure recorded"
        );

        ProcessOutcome::success(serde_json::json!({
            "failedPayments": failed,
            "cancelledOrders": cancelled,
        }))
    }

    /// Queue the welcome and receipt emails. Failures are logged and
    /// swallowed: the money already moved, so email trouble must not turn a
    /// fulfilled checkout into a failed webhook.
    async fn enqueue_fulfillment_emails(&self, fulfillment: &Fulfillment) {
        let login_url = format!(
            "{}/auth/auto-login?token={}",
            self.base_url.trim_end_matches('/'),
            fulfillment.login_token
        );

        let welcome = OutboundEmail::Welcome(WelcomeEmail {
            to: fulfillment.account_email.as_str().to_string(),
            name: fulfillment.account_name.clone(),
            business_name: fulfillment.business_name.clone(),
            login_url,
            expires_minutes: (fulfillment.token_expires_at - chrono::Utc::now())
                .num_minutes()
                .max(1),
        });
        if let Err(e) = self.email_queue.enqueue(&welcome).await {
            warn!(order_id = %fulfillment.order_id, error = %e, "Failed to enqueue welcome email");
        }

        let receipt = OutboundEmail::Receipt(ReceiptEmail {
            to: fulfillment.account_email.as_str().to_string(),
            name: fulfillment.account_name.clone(),
            business_name: fulfillment.business_name.clone(),
            amount: fulfillment.amount.to_string(),
            description: format!("Website setup for {}", fulfillment.business_name),
        });
        if let Err(e) = self.email_queue.enqueue(&receipt).await {
            warn!(order_id = %fulfillment.order_id, error = %e, "Failed to enqueue receipt email");
        }
    }

    /// Best-effort operator telemetry; never affects the outcome.
    async fn notify_new_sale(&self, fulfillment: &Fulfillment) {
        let notification = notifications::NewNotification {
            account_id: None,
            title: "New sale".to_string(),
            message: format!(
                "{} purchased a website ({})",
                fulfillment.business_name, fulfillment.amount
            ),
            category: "order".to_string(),
            priority: "normal".to_string(),
            action_url: None,
            action_label: None,
            metadata: serde_json::json!({
                "orderId": fulfillment.order_id,
                "checkoutSessionId": fulfillment.checkout_session_id,
            }),
        };

        if let Err(e) = notifications::create(&self.pool, notification).await {
            warn!(order_id = %fulfillment.order_id, error = %e, "Failed to create sale notification");
        }
    }
}
