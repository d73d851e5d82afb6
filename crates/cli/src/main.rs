//! Salonkit CLI - database migrations and operational tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending database migrations
//! salonkit migrate run
//!
//! # Insert the built-in website template catalog
//! salonkit seed templates
//!
//! # Inspect the transactional email queue
//! salonkit queue status
//! ```
//!
//! # Commands
//!
//! - `migrate run` - Apply pending database migrations
//! - `seed templates` - Seed the website template catalog
//! - `queue status` - Show email queue counts and recent entries

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "salonkit")]
#[command(author, version, about = "Salonkit CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Inspect the email queue
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Run,
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert the built-in website templates
    Templates,
}

#[derive(Subcommand)]
enum QueueAction {
    /// Show queue counts and the most recent entries
    Status,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { action } => match action {
            MigrateAction::Run => commands::migrate::run().await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Templates => commands::seed::templates().await?,
        },
        Commands::Queue { action } => match action {
            QueueAction::Status => commands::queue::status().await?,
        },
    }
    Ok(())
}
