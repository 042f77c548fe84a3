//! Lotus Market CLI - Database migrations and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! lotus migrate
//!
//! # Insert sample products
//! lotus seed
//!
//! # Correct a product's stock after a recount
//! lotus stock set 12 40
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use lotus_core::ProductId;

mod commands;

#[derive(Parser)]
#[command(name = "lotus")]
#[command(author, version, about = "Lotus Market CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog with sample products
    Seed,
    /// Manage product stock
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
}

#[derive(Subcommand)]
enum StockAction {
    /// Overwrite a product's stock quantity
    Set {
        /// Product id
        product_id: i32,

        /// New quantity on hand
        quantity: i32,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::products().await?,
        Commands::Stock { action } => match action {
            StockAction::Set {
                product_id,
                quantity,
            } => commands::stock::set(ProductId::new(product_id), quantity).await?,
        },
    }
    Ok(())
}
