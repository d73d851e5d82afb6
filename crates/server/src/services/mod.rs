//! Business logic services.

pub mod email_queue;
pub mod fulfillment;
pub mod mailer;
pub mod retry;
pub mod webhooks;
