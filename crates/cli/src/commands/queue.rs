//! Email queue inspection.
//!
//! Read-only view of the transactional email queue for operators: counts by
//! status plus the most recent entries. Stored payloads (recipient
//! addresses, login links) are not printed.
//!
//! # Usage
//!
//! ```bash
//! salonkit queue status
//! ```

use salonkit_server::db::email_queue;

/// How many recent entries to list.
const RECENT_LIMIT: i64 = 20;

/// Print queue counts and the most recent entries.
///
/// # Errors
///
/// Returns an error if the database URL is missing or a query fails.
pub async fn status() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = super::database_url().ok_or("SALONKIT_DATABASE_URL not set")?;
    let pool = salonkit_server::db::create_pool(&database_url).await?;

    let counts = email_queue::counts(&pool).await?;
    let recent = email_queue::recent(&pool, RECENT_LIMIT).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Email queue");
        println!("  pending:    {}", counts.pending);
        println!("  processing: {}", counts.processing);
        println!("  sent:       {}", counts.sent);
        println!("  failed:     {}", counts.failed);

        if !recent.is_empty() {
            println!();
            println!("Recent entries (newest first):");
            for row in &recent {
                println!(
                    "  {}  {:?} {:?}  attempts {}/{}  next attempt {}",
                    row.id,
                    row.kind,
                    row.status,
                    row.attempts,
                    row.max_attempts,
                    row.next_attempt_at.format("%Y-%m-%d %H:%M:%S UTC"),
                );
                if let Some(error) = &row.last_error {
                    println!("      last error: {error}");
                }
            }
        }
    }

    Ok(())
}
