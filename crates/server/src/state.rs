//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::email_queue::EmailQueue;
use crate::services::fulfillment::FulfillmentService;
use crate::services::mailer::Mailer;
use crate::services::retry::RetryPolicy;
use crate::services::webhooks::WebhookProcessor;
use crate::stripe::WebhookVerifier;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    verifier: WebhookVerifier,
    email_queue: EmailQueue,
    fulfillment: FulfillmentService,
    processor: WebhookProcessor,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `pool` - `PostgreSQL` connection pool
    /// * `mailer` - SMTP mailer for the email queue
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool, mailer: Mailer) -> Self {
        let verifier = WebhookVerifier::new(config.stripe.webhook_secret.clone());
        let email_queue = EmailQueue::new(pool.clone(), mailer, RetryPolicy::default());
        let fulfillment = FulfillmentService::new(pool.clone());
        let processor = WebhookProcessor::new(
            pool.clone(),
            fulfillment.clone(),
            email_queue.clone(),
            config.base_url.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                verifier,
                email_queue,
                fulfillment,
                processor,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the webhook signature verifier.
    #[must_use]
    pub fn verifier(&self) -> &WebhookVerifier {
        &self.inner.verifier
    }

    /// Get a reference to the email queue.
    #[must_use]
    pub fn email_queue(&self) -> &EmailQueue {
        &self.inner.email_queue
    }

    /// Get a reference to the fulfillment service.
    #[must_use]
    pub fn fulfillment(&self) -> &FulfillmentService {
        &self.inner.fulfillment
    }

    /// Get a reference to the webhook processor.
    #[must_use]
    pub fn processor(&self) -> &WebhookProcessor {
        &self.inner.processor
    }
}
