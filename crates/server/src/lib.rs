//! Salonkit server - payment webhook processing and checkout fulfillment.
//!
//! Receives Stripe webhooks, verifies their signatures, de-duplicates them
//! through a database-backed event ledger, and turns paid checkout sessions
//! into accounts, orders, and queued transactional email.
//!
//! # Architecture
//!
//! - Axum web framework
//! - `PostgreSQL` for all durable state (accounts, orders, payments, the
//!   event ledger, and the email queue)
//! - lettre + Askama for transactional email
//! - Sentry + tracing for observability

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod stripe;

/// Embedded migrations for the salonkit schema.
///
/// Applied explicitly via `salonkit-cli migrate run`, never on server startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
