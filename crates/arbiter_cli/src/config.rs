//! Configuration file support for arbiter.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `ARBITER_`, sections split by `__`,
//!    e.g. `ARBITER_DATABASE__URL`, `ARBITER_KEEPA__API_KEY`)
//! 3. Config file (./arbiter.toml, then ~/.config/arbiter/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/arbiter/arbiter.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/arbiter/arbiter.db"  # optional, this is the default
//!
//! [user]
//! id = "7f1c0f52-4f4e-4d0b-9d1e-2b1c3a4d5e6f"
//!
//! [amazon]
//! access_token = "Atza|..."
//! marketplace_id = "A1F83G8C2ARO7P"
//!
//! [ebay]
//! token = "v^1.1#..."
//!
//! [bricklink]
//! consumer_key = "..."
//! consumer_secret = "..."
//! token = "..."
//! token_secret = "..."
//!
//! [keepa]
//! api_key = "..."
//! refill_per_minute = 20
//!
//! [sync]
//! pass_timeout_secs = 1800
//! include_line_items = true
//! concurrency = 4
//! order_interval_minutes = 15
//!
//! [reconcile]
//! sku_prefix = "SYNC-"
//!
//! [notify]
//! webhook_url = "https://hooks.example.com/arbiter"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use uuid::Uuid;

use arbiter::entity::job_type::JobType;
use arbiter::reconcile::{DEFAULT_BATCH_SIZE, DEFAULT_SKU_PREFIX, ReconcileOptions};
use arbiter::status::JobIntervals;
use arbiter::sync::{DEFAULT_CONCURRENCY, DEFAULT_PAGE_LIMIT, DEFAULT_PASS_TIMEOUT, SyncOptions};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub user: UserConfig,
    pub amazon: AmazonConfig,
    pub ebay: EbayConfig,
    pub bricklink: BrickLinkConfig,
    pub keepa: KeepaConfig,
    pub sync: SyncConfig,
    pub reconcile: ReconcileConfig,
    pub notify: NotifyConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    /// Defaults to `sqlite://~/.local/state/arbiter/arbiter.db` if not specified.
    pub url: Option<String>,
}

/// The account every row is scoped to.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Defaults to the nil UUID for single-operator installs.
    pub id: Option<Uuid>,
}

/// Budget overrides shared by every source section.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RateOverrides {
    pub refill_per_minute: Option<f64>,
    pub min_gap_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AmazonConfig {
    pub base_url: Option<String>,
    pub access_token: Option<String>,
    pub marketplace_id: Option<String>,
    #[serde(flatten)]
    pub rate: RateOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EbayConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub marketplace: Option<String>,
    #[serde(flatten)]
    pub rate: RateOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BrickLinkConfig {
    pub base_url: Option<String>,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub token: Option<String>,
    pub token_secret: Option<String>,
    #[serde(flatten)]
    pub rate: RateOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KeepaConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Keepa marketplace domain id (2 = amazon.co.uk).
    pub domain: Option<u8>,
    #[serde(flatten)]
    pub rate: RateOverrides,
}

/// Default sync options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub pass_timeout_secs: u64,
    pub include_line_items: bool,
    /// Sources synced at once.
    pub concurrency: usize,
    pub page_limit: u32,
    pub order_interval_minutes: i64,
    pub price_interval_minutes: i64,
    pub comparison_interval_minutes: i64,
    pub reconcile_interval_minutes: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pass_timeout_secs: DEFAULT_PASS_TIMEOUT.as_secs(),
            include_line_items: true,
            concurrency: DEFAULT_CONCURRENCY,
            page_limit: DEFAULT_PAGE_LIMIT,
            order_interval_minutes: 15,
            price_interval_minutes: 60,
            comparison_interval_minutes: 360,
            reconcile_interval_minutes: 15,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub sku_prefix: String,
    pub batch_size: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            sku_prefix: DEFAULT_SKU_PREFIX.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// POST notifications here as JSON. Logged only when unset.
    pub webhook_url: Option<String>,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/arbiter/config.toml)
    /// 3. Local config file (./arbiter.toml)
    /// 4. Environment variables with ARBITER_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(config_path) = Self::default_config_path()
            && config_path.exists()
        {
            tracing::debug!("Loading config from {:?}", config_path);
            builder = builder.add_source(
                File::from(config_path)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("arbiter.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./arbiter.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // ARBITER_KEEPA__API_KEY -> keepa.api_key
        builder = builder.add_source(
            Environment::with_prefix("ARBITER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("arbiter.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id.unwrap_or(Uuid::nil())
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            page_limit: self.sync.page_limit.max(1),
            include_line_items: self.sync.include_line_items,
            pass_timeout: Duration::from_secs(self.sync.pass_timeout_secs.max(1)),
            concurrency: self.sync.concurrency.max(1),
        }
    }

    pub fn job_intervals(&self) -> JobIntervals {
        let minutes = chrono::Duration::minutes;
        JobIntervals::new()
            .with(JobType::OrderSync, minutes(self.sync.order_interval_minutes))
            .with(JobType::PriceSync, minutes(self.sync.price_interval_minutes))
            .with(
                JobType::ComparisonSync,
                minutes(self.sync.comparison_interval_minutes),
            )
            .with(
                JobType::Reconciliation,
                minutes(self.sync.reconcile_interval_minutes),
            )
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            sku_prefix: self.reconcile.sku_prefix.clone(),
            batch_size: self.reconcile.batch_size.max(1),
            pass_timeout: Duration::from_secs(self.sync.pass_timeout_secs.max(1)),
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "arbiter").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/arbiter` or `~/.local/state/arbiter`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "arbiter").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
