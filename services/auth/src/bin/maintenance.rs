//! Maintenance tasks for the auth tables, meant for a scheduler (cron, k8s CronJob).
//!
//! # Usage
//!
//! ```bash
//! DATABASE_URL=postgres://... maintenance cleanup-all
//! DATABASE_URL=postgres://... maintenance cleanup-codes
//! ```

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use sea_orm::Database;

use financehub_auth::infra::db::{DbAuthCodeRepository, DbSessionRepository};
use financehub_auth::usecase::cleanup::{CleanupUseCase, ExpiredKind};
use financehub_core::tracing::init_tracing;

#[derive(Parser)]
#[command(about = "Delete expired auth codes and sessions")]
struct Args {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Delete auth codes that are expired or already used
    CleanupCodes,
    /// Delete sessions past their expiry
    CleanupSessions,
    /// Both of the above
    CleanupAll,
}

impl Command {
    fn kinds(&self) -> &'static [ExpiredKind] {
        match self {
            Self::CleanupCodes => &[ExpiredKind::Codes],
            Self::CleanupSessions => &[ExpiredKind::Sessions],
            Self::CleanupAll => &[ExpiredKind::Codes, ExpiredKind::Sessions],
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info,sqlx=warn");
    let args = Args::parse();

    let db = Database::connect(&args.database_url)
        .await
        .context("connect to database")?;

    let usecase = CleanupUseCase {
        auth_codes: DbAuthCodeRepository { db: db.clone() },
        sessions: DbSessionRepository { db },
    };

    for kind in args.command.kinds() {
        let deleted = usecase
            .execute(*kind)
            .await
            .with_context(|| format!("cleanup {kind:?}"))?;
        println!("{kind:?}: deleted {deleted} row(s)");
    }
    Ok(())
}
