//! Tracked item and cross-listing registry commands.

use arbiter::entity::cross_listing;
use arbiter::entity::item_status::{ItemStatus, MatchConfidence};
use arbiter::entity::listing_status::CrossListingStatus;
use arbiter::entity::source::Source;
use arbiter::entity::tracked_item;
use arbiter::store::{cross_listings, items};
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::commands::output::{OutputFormat, print_rows};
use crate::commands::shared::open_session;
use crate::config::Config;

#[derive(Debug, Subcommand)]
pub(crate) enum ItemAction {
    /// Start tracking an item (or rename one already tracked)
    Add {
        /// Item id on its sell-side source (e.g. an ASIN)
        external_id: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Sell-side source
        #[arg(short, long, default_value = "amazon")]
        source: Source,
    },
    /// Point an item at a comparison id (e.g. a set number)
    Map {
        /// Tracked item id
        id: Uuid,

        /// Comparison id searched on listing sources
        comparison_id: String,

        /// Match confidence: exact, likely or manual
        #[arg(short, long, default_value = "manual")]
        confidence: MatchConfidence,
    },
    /// Clear an item's comparison id
    Unmap {
        /// Tracked item id
        id: Uuid,
    },
    /// Stop observing an item without deleting it
    Exclude {
        /// Tracked item id
        id: Uuid,
    },
    /// Resume observing an excluded item
    Restore {
        /// Tracked item id
        id: Uuid,
    },
    /// List tracked items
    List {
        /// Include excluded items
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum CrossListAction {
    /// Register an item as live on several sources
    Register {
        /// Item key shared by the listings (the SKU without its prefix)
        item_key: String,

        /// Sources the item is listed on, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        on: Vec<Source>,

        /// Item title
        #[arg(short, long)]
        title: Option<String>,
    },
    /// List registered items
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(Debug, Tabled, Serialize)]
struct ItemRow {
    #[tabled(rename = "Id")]
    id: Uuid,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "External Id")]
    external_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Comparison")]
    comparison: String,
    #[tabled(rename = "Match")]
    confidence: String,
}

impl From<&tracked_item::Model> for ItemRow {
    fn from(item: &tracked_item::Model) -> Self {
        Self {
            id: item.id,
            source: item.source.to_string(),
            external_id: item.external_id.clone(),
            name: item.name.clone(),
            status: item.status.to_string(),
            comparison: item.comparison_id.clone().unwrap_or_else(|| "-".to_string()),
            confidence: item.match_confidence.to_string(),
        }
    }
}

#[derive(Debug, Tabled, Serialize)]
struct CrossListingRow {
    #[tabled(rename = "Item")]
    item_key: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Listed On")]
    listed_on: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Sold On")]
    sold_on: String,
}

impl From<&cross_listing::Model> for CrossListingRow {
    fn from(entry: &cross_listing::Model) -> Self {
        Self {
            item_key: entry.item_key.clone(),
            title: entry.title.clone().unwrap_or_default(),
            listed_on: entry
                .listed_sources()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            status: entry.status.to_string(),
            // A relisted item keeps its last sale on record; only show it
            // while that sale is current.
            sold_on: entry
                .sold_on
                .filter(|_| entry.status != CrossListingStatus::Published)
                .map_or_else(|| "-".to_string(), |s| s.to_string()),
        }
    }
}

fn print_item(verb: &str, item: &tracked_item::Model) {
    println!("{} {} ({}) [{}]", verb, item.name, item.external_id, item.id);
}

/// Handle `arbiter items`.
pub(crate) async fn handle_items(
    action: ItemAction,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config, database_url, None).await?;
    let db = session.ctx.db();
    let user_id = session.ctx.user_id();

    match action {
        ItemAction::Add {
            external_id,
            name,
            source,
        } => {
            let item = items::discover(db, user_id, source, &external_id, &name).await?;
            print_item("Tracking", &item);
        }
        ItemAction::Map {
            id,
            comparison_id,
            confidence,
        } => {
            let item = items::remap(db, user_id, id, Some(comparison_id), confidence).await?;
            print_item("Mapped", &item);
        }
        ItemAction::Unmap { id } => {
            let item = items::remap(db, user_id, id, None, MatchConfidence::Unmatched).await?;
            print_item("Unmapped", &item);
        }
        ItemAction::Exclude { id } => {
            let item = items::set_status(db, user_id, id, ItemStatus::Excluded).await?;
            print_item("Excluded", &item);
        }
        ItemAction::Restore { id } => {
            let item = items::set_status(db, user_id, id, ItemStatus::Active).await?;
            print_item("Restored", &item);
        }
        ItemAction::List { all, output } => {
            let status = if all { None } else { Some(ItemStatus::Active) };
            let tracked = items::list(db, user_id, status).await?;
            let rows: Vec<ItemRow> = tracked.iter().map(ItemRow::from).collect();
            print_rows(&rows, output)?;
        }
    }
    Ok(())
}

/// Handle `arbiter crosslist`.
pub(crate) async fn handle_crosslist(
    action: CrossListAction,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config, database_url, None).await?;
    let db = session.ctx.db();
    let user_id = session.ctx.user_id();

    match action {
        CrossListAction::Register {
            item_key,
            on,
            title,
        } => {
            let entry = cross_listings::register(db, user_id, &item_key, title, &on).await?;
            let row = CrossListingRow::from(&entry);
            println!("Registered {} on {}", row.item_key, row.listed_on);
        }
        CrossListAction::List { output } => {
            let entries = cross_listings::list(db, user_id, None).await?;
            let rows: Vec<CrossListingRow> = entries.iter().map(CrossListingRow::from).collect();
            print_rows(&rows, output)?;
        }
    }
    Ok(())
}
