//! Vitrine CLI - migrations, credit administration and theme mock seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! vt-cli migrate
//!
//! # Grant credits to a store owner
//! vt-cli credits grant --owner 2f6d3c1e-8a4b-4f7e-9c2d-1b3a5e7f9d0c --amount 100
//!
//! # Show an owner's balance
//! vt-cli credits show --owner 2f6d3c1e-8a4b-4f7e-9c2d-1b3a5e7f9d0c
//!
//! # Replace a theme's mock data from a YAML file
//! vt-cli theme seed-mock --theme 7b1e... --file mock.yaml
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "vt-cli")]
#[command(author, version, about = "Vitrine CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage store owner credits
    Credits {
        #[command(subcommand)]
        action: CreditsAction,
    },
    /// Manage theme data
    Theme {
        #[command(subcommand)]
        action: ThemeAction,
    },
}

#[derive(Subcommand)]
enum CreditsAction {
    /// Add credits to an owner's balance
    Grant {
        /// Owner (auth user) id
        #[arg(short, long)]
        owner: Uuid,

        /// Credits to add
        #[arg(short, long)]
        amount: i64,
    },
    /// Show an owner's balance
    Show {
        /// Owner (auth user) id
        #[arg(short, long)]
        owner: Uuid,
    },
}

#[derive(Subcommand)]
enum ThemeAction {
    /// Replace a theme's mock categories, products and settings
    SeedMock {
        /// Theme id
        #[arg(short, long)]
        theme: Uuid,

        /// YAML seed file
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Credits { action } => match action {
            CreditsAction::Grant { owner, amount } => {
                commands::credits::grant(owner, amount).await?;
            }
            CreditsAction::Show { owner } => commands::credits::show(owner).await?,
        },
        Commands::Theme { action } => match action {
            ThemeAction::SeedMock { theme, file } => {
                commands::theme::seed_mock(theme, &file).await?;
            }
        },
    }
    Ok(())
}
