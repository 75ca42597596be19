//! Arbiter CLI - command-line trigger surface for the sync engine.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::arbitrage::{ArbitrageArgs, ExcludeAction};
use crate::commands::items::{CrossListAction, ItemAction};
use crate::commands::migrate::MigrateAction;
use crate::commands::output::OutputFormat;
use crate::commands::reconcile::RemovalAction;
use crate::commands::sync::{HistoricalArgs, SyncArgs, Target};

#[derive(Parser)]
#[command(name = "arbiter")]
#[command(version)]
#[command(about = "Multi-marketplace order sync, reconciliation and arbitrage margins")]
#[command(
    long_about = "Arbiter pulls orders from Amazon, eBay and BrickLink, prices from Keepa and \
competing listings from eBay and BrickLink into one database. It flags cross-listed items that \
sold on one marketplace and must come down elsewhere, and reports margins against the cheapest \
comparison listing."
)]
#[command(after_long_help = r#"EXAMPLES
    Sync new orders from every configured source:
        $ arbiter sync all

    Re-import last year's BrickLink orders:
        $ arbiter historical bricklink --from 2025-01-01 --to 2025-12-31

    Track an item and register it as cross-listed:
        $ arbiter items add B000FALCON --name "Millennium Falcon"
        $ arbiter crosslist register 75192 --on amazon,ebay,bricklink

    Queue removals for items that sold elsewhere, then review them:
        $ arbiter reconcile
        $ arbiter removals list

    Show items with at least a 30% margin:
        $ arbiter arbitrage --min-margin 30

CONFIGURATION
    Arbiter reads configuration from:
      1. ~/.config/arbiter/config.toml (or $XDG_CONFIG_HOME/arbiter/config.toml)
      2. ./arbiter.toml
      3. Environment variables (ARBITER_* prefix, sections split by "__")
      4. .env file in current directory

ENVIRONMENT VARIABLES
    ARBITER_DATABASE__URL         Database connection string (default: ~/.local/state/arbiter/arbiter.db)
    ARBITER_USER__ID              Account id every row is scoped to
    ARBITER_AMAZON__ACCESS_TOKEN  Selling Partner API access token
    ARBITER_EBAY__TOKEN           eBay OAuth user token
    ARBITER_KEEPA__API_KEY        Keepa API key
    ARBITER_NOTIFY__WEBHOOK_URL   Webhook for removal and failure notifications
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Sync orders from one source or all of them
    Sync(SyncArgs),
    /// Refresh price observations for every active item
    Prices {
        /// Price source
        #[arg(default_value = "keepa")]
        source: Target,
    },
    /// Refresh comparison listings for every mapped item
    Comparisons {
        /// Listing source, or "all"
        #[arg(default_value = "all")]
        source: Target,
    },
    /// Import orders created within a date range
    Historical(HistoricalArgs),
    /// Manage tracked items and their comparison ids
    Items {
        #[command(subcommand)]
        action: ItemAction,
    },
    /// Manage the registry of items listed on several marketplaces
    Crosslist {
        #[command(subcommand)]
        action: CrossListAction,
    },
    /// Match stored sales against cross-listed items and queue removals
    Reconcile {
        /// Order sources to reconcile (default: all)
        sources: Vec<arbiter::Source>,
    },
    /// Review the removal queue
    Removals {
        #[command(subcommand)]
        action: RemovalAction,
    },
    /// Manage comparison listing exclusions
    Exclude {
        #[command(subcommand)]
        action: ExcludeAction,
    },
    /// Show margins against the cheapest comparison listing
    Arbitrage(ArbitrageArgs),
    /// Show the latest run of every job and whether it is due
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Interactive runs render progress bars instead of log lines.
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("arbiter=info,arbiter_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = config::Config::load();

    let cli = Cli::parse();

    // Handle commands that don't require database access first
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(());
        }
        _ => {}
    }

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set [database] url")?;

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        // Strip query parameters (e.g., ?mode=rwc) before path operations
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory. \
                 Consider using an absolute path.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    let shutdown_flag = shutdown::setup_shutdown_handler();

    match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Sync(args) => {
            commands::sync::handle_sync(args, &config, &database_url, shutdown_flag).await?;
        }
        Commands::Prices { source } => {
            commands::sync::handle_prices(source, &config, &database_url, shutdown_flag).await?;
        }
        Commands::Comparisons { source } => {
            commands::sync::handle_comparisons(source, &config, &database_url, shutdown_flag)
                .await?;
        }
        Commands::Historical(args) => {
            commands::sync::handle_historical(args, &config, &database_url, shutdown_flag)
                .await?;
        }
        Commands::Items { action } => {
            commands::items::handle_items(action, &config, &database_url).await?;
        }
        Commands::Crosslist { action } => {
            commands::items::handle_crosslist(action, &config, &database_url).await?;
        }
        Commands::Reconcile { sources } => {
            commands::reconcile::handle_reconcile(sources, &config, &database_url, shutdown_flag)
                .await?;
        }
        Commands::Removals { action } => {
            commands::reconcile::handle_removals(action, &config, &database_url).await?;
        }
        Commands::Exclude { action } => {
            commands::arbitrage::handle_exclude(action, &config, &database_url).await?;
        }
        Commands::Arbitrage(args) => {
            commands::arbitrage::handle_arbitrage(args, &config, &database_url).await?;
        }
        Commands::Status { output } => {
            commands::status::handle_status(output, &config, &database_url).await?;
        }
        Commands::Completions { .. } | Commands::Man { .. } => {}
    }

    Ok(())
}
