//! Schema migration commands.

use arbiter::db;
use arbiter::migration::{Migrator, MigratorTrait};
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, print_rows};

#[derive(Debug, Subcommand)]
pub(crate) enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Roll back the last applied migration
    Down,
    /// Show which migrations are applied
    Status,
    /// Drop every table and rebuild the schema (destroys all synced data)
    Fresh {
        /// Confirm that all orders, cursors and removal entries may be lost
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Tabled, Serialize)]
struct MigrationRow {
    #[tabled(rename = "Migration")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
}

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            if pending == 0 {
                println!("Schema is up to date.");
                return Ok(());
            }
            Migrator::up(&db, None).await?;
            println!("Applied {} migration(s).", pending);
        }
        MigrateAction::Down => {
            Migrator::down(&db, Some(1)).await?;
            println!("Rolled back the last migration.");
        }
        MigrateAction::Status => {
            let rows: Vec<MigrationRow> = Migrator::get_migration_with_status(&db)
                .await?
                .iter()
                .map(|m| MigrationRow {
                    name: m.name().to_string(),
                    status: m.status().to_string(),
                })
                .collect();
            print_rows(&rows, OutputFormat::Table)?;
        }
        MigrateAction::Fresh { yes } => {
            if !yes {
                return Err("`migrate fresh` drops every table; pass --yes to confirm".into());
            }
            Migrator::fresh(&db).await?;
            tracing::warn!(database = %database_url, "Schema rebuilt from scratch");
            println!("Schema rebuilt; all synced data was dropped.");
        }
    }

    Ok(())
}
