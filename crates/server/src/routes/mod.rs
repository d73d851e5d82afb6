//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! POST   /webhooks/stripe          - Stripe webhook delivery
//!
//! # Ops (internal)
//! GET    /admin/emails/queue       - Email queue counts + redacted listing
//! POST   /admin/emails/{id}/retry  - Reset a dead-lettered email
//! DELETE /admin/emails/sent        - Garbage-collect sent entries
//! POST   /admin/test/checkout      - Simulate a paid checkout (gated by
//!                                    SALONKIT_ENABLE_TEST_ENDPOINTS)
//!
//! # Health (registered in main)
//! GET    /health                   - Liveness
//! GET    /health/ready             - Readiness (checks database)
//! ```

pub mod admin;
pub mod webhooks;

use axum::Router;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Create the application router (webhook + ops routes).
pub fn router(config: &ServerConfig) -> Router<AppState> {
    Router::new()
        .merge(webhooks::router())
        .merge(admin::router(config))
}
