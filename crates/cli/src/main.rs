//! BizShop CLI - Database migrations and platform management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bizshop migrate
//!
//! # Designate the super admin (at most one account)
//! bizshop admin promote -e owner@bizshop.in -r super_admin
//!
//! # Back to a regular seller account
//! bizshop admin demote -e owner@bizshop.in
//!
//! # Expire lapsed trials and periods (run from cron)
//! bizshop subscriptions expire --dry-run
//!
//! # Print the plan catalog
//! bizshop plans
//! ```
//!
//! # Environment Variables
//!
//! - `BIZSHOP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bizshop")]
#[command(author, version, about = "BizShop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage platform roles
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Subscription maintenance
    Subscriptions {
        #[command(subcommand)]
        action: SubscriptionAction,
    },
    /// Print the plan catalog
    Plans,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Give an existing account a staff role
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Role (`admin` or `super_admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,
    },
    /// Make an account a regular seller again
    Demote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum SubscriptionAction {
    /// Expire every trial or paid period that has lapsed
    Expire {
        /// Report what would expire without writing
        #[arg(long)]
        dry_run: bool,
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

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Promote { email, role } => {
                commands::admin::promote(&email, &role).await?;
            }
            AdminAction::Demote { email } => commands::admin::demote(&email).await?,
        },
        Commands::Subscriptions { action } => match action {
            SubscriptionAction::Expire { dry_run } => {
                commands::subscriptions::expire(dry_run).await?;
            }
        },
        Commands::Plans => commands::plans::print(),
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_promote_defaults_to_admin() {
        let cli = Cli::try_parse_from(["bizshop", "admin", "promote", "-e", "a@shop.in"]).unwrap();
        let Commands::Admin {
            action: AdminAction::Promote { email, role },
        } = cli.command
        else {
            panic!("expected admin promote");
        };
        assert_eq!(email, "a@shop.in");
        assert_eq!(role, "admin");
    }

    #[test]
    fn test_expire_dry_run_flag() {
        let cli = Cli::try_parse_from(["bizshop", "subscriptions", "expire", "--dry-run"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Subscriptions {
                action: SubscriptionAction::Expire { dry_run: true }
            }
        ));
    }
}
