//! Stripe webhook integration: signature verification and event models.

pub mod events;
pub mod signature;

pub use events::{
    CheckoutSession, EventParseError, PaymentIntent, SessionMetadata, StripeEvent,
    WebhookEventKind,
};
pub use signature::{SignatureError, WebhookVerifier};
