//! Database migration management commands.

use clap::{Args, Subcommand};

use awcms_core::error::{AppError, ErrorKind};

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Check that the database answers
    Ping,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config_path: &str) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = super::create_db_pool(&config).await?;

    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            awcms_database::migration::run_migrations(pool.pool()).await?;
            output::print_success("All migrations applied successfully.");
        }
        MigrateCommand::Ping => {
            if pool.health_check().await? {
                output::print_success("Database is reachable.");
            } else {
                return Err(AppError::new(
                    ErrorKind::ServiceUnavailable,
                    "Database returned an unexpected health check result",
                ));
            }
        }
    }

    Ok(())
}
