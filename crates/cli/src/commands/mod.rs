//! CLI command implementations.

pub mod migrate;
pub mod queue;
pub mod seed;

use secrecy::SecretString;

/// Read the database URL from the environment.
///
/// Falls back to the generic `DATABASE_URL` set by Fly.io postgres attach.
fn database_url() -> Option<SecretString> {
    std::env::var("SALONKIT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .ok()
}
