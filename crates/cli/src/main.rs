//! DeskOps CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! deskops-cli migrate
//!
//! # Create a staff account (password generated and printed once)
//! deskops-cli user create -e admin@example.com -n "Admin Name" -r admin
//!
//! # Mark WordPress users without roles as suspended in the local cache
//! deskops-cli wordpress sync-suspended
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create accounts
//! - `wordpress sync-suspended` - Import suspension state from WordPress

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "deskops-cli")]
#[command(author, version, about = "DeskOps CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage DeskOps accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// WordPress maintenance
    Wordpress {
        #[command(subcommand)]
        action: WordPressAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`admin`, `coordinator`, `editor`, `viewer`, `customer`)
        #[arg(short, long, default_value = "viewer")]
        role: String,

        /// Password; generated and printed when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum WordPressAction {
    /// Mark WordPress users that have no roles as suspended
    SyncSuspended,
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
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::user::create(&email, &name, &role, password).await?;
            }
        },
        Commands::Wordpress { action } => match action {
            WordPressAction::SyncSuspended => commands::wordpress::sync_suspended().await?,
        },
    }
    Ok(())
}
