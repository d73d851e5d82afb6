//! Seed the website template catalog.
//!
//! Inserts the built-in templates if they are not already present (matched
//! by name), so the command is safe to run repeatedly. Fulfillment creates
//! the starter template lazily if seeding never ran; this catalog just gives
//! new orders something nicer to start from.
//!
//! # Usage
//!
//! ```bash
//! salonkit seed templates
//! ```

use tracing::info;

/// Built-in template catalog: (name, category, description).
const TEMPLATES: &[(&str, &str, &str)] = &[
    (
        "Starter",
        "starter",
        "Default template assigned to new orders",
    ),
    (
        "Salon Classique",
        "salon",
        "Warm, editorial layout for hair salons",
    ),
    (
        "Fade District",
        "barbershop",
        "High-contrast layout for barbershops",
    ),
    (
        "Polish & Co",
        "nail_studio",
        "Gallery-first layout for nail studios",
    ),
    (
        "Stillwater",
        "spa",
        "Calm, airy layout for spas and wellness studios",
    ),
];

/// Insert the built-in templates.
///
/// # Errors
///
/// Returns an error if the database URL is missing or an insert fails.
pub async fn templates() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = super::database_url().ok_or("SALONKIT_DATABASE_URL not set")?;

    let pool = salonkit_server::db::create_pool(&database_url).await?;
    info!("Connected to database");

    let mut inserted = 0u32;
    let mut skipped = 0u32;
    for &(name, category, description) in TEMPLATES {
        let result = sqlx::query(
            r"
            INSERT INTO website_templates (name, category, description, is_active)
            SELECT $1, $2, $3, true
            WHERE NOT EXISTS (SELECT 1 FROM website_templates WHERE name = $1)
            ",
        )
        .bind(name)
        .bind(category)
        .bind(description)
        .execute(&pool)
        .await?;

        if result.rows_affected() == 0 {
            skipped += 1;
        } else {
            inserted += 1;
            info!(name, category, "Template inserted");
        }
    }

    info!(inserted, skipped, "Template catalog seeded");
    Ok(())
}
