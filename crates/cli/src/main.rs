//! Bazaar CLI - Database migrations, seeding and admin tools.
//!
//! # Usage
//!
//! ```bash
//! # Run API database migrations
//! bazaar-cli migrate
//!
//! # Replace all data with the sample catalog
//! bazaar-cli seed import
//! bazaar-cli seed import --file my-catalog.yaml
//!
//! # Delete all orders, products and users
//! bazaar-cli seed destroy
//!
//! # Create an admin user
//! bazaar-cli admin create -e admin@example.com -n "Admin Name" -p 's3cret!!'
//! ```
//!
//! # Environment Variables
//!
//! - `BAZAAR_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load or wipe sample data
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum SeedAction {
    /// Wipe orders, products and users, then load sample users and products
    Import {
        /// YAML seed file (defaults to the bundled sample catalog)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Wipe orders, products and users
    Destroy,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin password (at least 6 characters)
        #[arg(short, long)]
        password: String,
    },
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { action } => match action {
            SeedAction::Import { file } => commands::seed::import(file.as_deref()).await?,
            SeedAction::Destroy => commands::seed::destroy().await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, &password).await?;
            }
        },
    }
    Ok(())
}
