//! Soko CLI - Database migrations and pricing tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! soko-cli migrate
//!
//! # Check how a phone number normalizes
//! soko-cli phone "0712 345 678"
//!
//! # Preview a ride fare
//! soko-cli fare --base-fare 200 --per-km 50 --distance-km 5
//!
//! # Price an errand
//! soko-cli errand --base-price 300 --urgency urgent
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use soko_core::Urgency;

mod commands;

#[derive(Parser)]
#[command(name = "soko-cli")]
#[command(author, version, about = "Soko CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Normalize a Kenyan phone number and check it is payable
    Phone {
        /// Number as typed by the customer
        number: String,
    },
    /// Preview a fare: base fare + distance x per-km rate
    Fare {
        /// Flat charge per trip (KES)
        #[arg(long)]
        base_fare: Decimal,

        /// Charge per kilometre (KES)
        #[arg(long)]
        per_km: Decimal,

        /// Trip distance in kilometres
        #[arg(long)]
        distance_km: Decimal,
    },
    /// Price an errand from its base price and urgency
    Errand {
        /// Base price (KES)
        #[arg(long)]
        base_price: Decimal,

        /// `normal`, `urgent` or `express`
        #[arg(long, default_value = "normal")]
        urgency: Urgency,
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
        Commands::Phone { number } => commands::quote::phone(&number),
        Commands::Fare {
            base_fare,
            per_km,
            distance_km,
        } => commands::quote::fare(base_fare, per_km, distance_km)?,
        Commands::Errand {
            base_price,
            urgency,
        } => commands::quote::errand(base_price, urgency)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_errand_urgency() {
        let cli = Cli::try_parse_from(["soko-cli", "errand", "--base-price", "300", "--urgency", "express"])
            .expect("valid args");
        match cli.command {
            Commands::Errand { base_price, urgency } => {
                assert_eq!(base_price, Decimal::from(300));
                assert_eq!(urgency, Urgency::Express);
            }
            _ => panic!("expected errand"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_urgency() {
        assert!(
            Cli::try_parse_from(["soko-cli", "errand", "--base-price", "300", "--urgency", "asap"])
                .is_err()
        );
    }
}
