//! Procura CLI - database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Apply server migrations
//! procura-cli migrate
//!
//! # Create an active buyer and print its API token
//! procura-cli user create -e buyer@example.com -t buyer
//!
//! # Create a shop owned by a partner account
//! procura-cli shop create -n "Svyaznoy" -u partner@example.com --url https://example.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "procura-cli")]
#[command(author, version, about = "Procura CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage shops
    Shop {
        #[command(subcommand)]
        action: ShopAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an active user and issue an API token
    Create {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account type (`buyer` or `shop`)
        #[arg(short = 't', long = "type", default_value = "buyer")]
        user_type: String,
    },
}

#[derive(Subcommand)]
enum ShopAction {
    /// Create a shop
    Create {
        /// Shop name
        #[arg(short, long)]
        name: String,

        /// Price list URL
        #[arg(long)]
        url: Option<String>,

        /// Email of the partner account that owns the shop
        #[arg(short, long = "user")]
        user_email: Option<String>,
    },
}

#[tokio::main]
async fn main() {
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
            UserAction::Create { email, user_type } => {
                let token = commands::user::create(&email, &user_type).await?;
                #[allow(clippy::print_stdout)]
                {
                    println!("{token}");
                }
            }
        },
        Commands::Shop { action } => match action {
            ShopAction::Create {
                name,
                url,
                user_email,
            } => {
                commands::shop::create(&name, url.as_deref(), user_email.as_deref()).await?;
            }
        },
    }
    Ok(())
}
