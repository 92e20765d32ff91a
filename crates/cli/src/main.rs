//! Cartwright CLI - database migrations, catalog import and order
//! administration.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! cw-cli migrate
//!
//! # Load or update products from a YAML catalog
//! cw-cli product import catalog.yaml
//!
//! # Move an order along its lifecycle
//! cw-cli order status CW-LZ3K9QX2-7G4QPA shipped
//!
//! # Record a payment outcome
//! cw-cli order payment CW-LZ3K9QX2-7G4QPA paid
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cartwright_core::{OrderStatus, PaymentStatus};

mod commands;

#[derive(Parser)]
#[command(name = "cw-cli")]
#[command(author, version, about = "Cartwright CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage the product catalog
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Administer orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Insert or update every product in a YAML file
    Import {
        /// Path to the catalog file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Change the order status (`processing`, `shipped`, `delivered`, `cancelled`, `returned`)
    Status {
        /// Order number, e.g. `CW-LZ3K9QX2-7G4QPA`
        number: String,
        status: OrderStatus,
    },
    /// Change the payment status (`pending`, `paid`, `failed`, `refunded`)
    Payment {
        /// Order number
        number: String,
        status: PaymentStatus,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::Product {
            action: ProductAction::Import { file },
        } => commands::product::import(&file).await,
        Commands::Order { action } => match action {
            OrderAction::Status { number, status } => commands::order::set_status(&number, status).await,
            OrderAction::Payment { number, status } => commands::order::set_payment(&number, status).await,
        },
    }
}
