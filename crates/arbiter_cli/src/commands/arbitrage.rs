//! Arbitrage view and exclusion commands.

use arbiter::arbitrage::{
    ArbitrageCalculator, ArbitrageFilter, ArbitrageSort, DataFilter, ItemMargins,
};
use arbiter::entity::source::Source;
use arbiter::store::{self, DEFAULT_PER_PAGE, ExclusionScope, Pagination};
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::commands::output::{OutputFormat, money, percent, print_rows};
use crate::commands::shared::open_session;
use crate::config::Config;

#[derive(Debug, Args)]
pub(crate) struct ArbitrageArgs {
    /// Only items with a margin of at least this percent
    #[arg(long)]
    min_margin: Option<Decimal>,

    /// Only items whose cost of goods is at most this percent of the sell price
    #[arg(long)]
    max_cog: Option<Decimal>,

    /// Check --max-cog against one listing source instead of all of them
    #[arg(long, requires = "max_cog")]
    cog_source: Option<Source>,

    /// Only items with comparison data
    #[arg(long, conflicts_with = "missing_data")]
    has_data: bool,

    /// Only items without comparison data
    #[arg(long)]
    missing_data: bool,

    /// Match item name, external id or comparison id
    #[arg(short, long)]
    search: Option<String>,

    /// Sort: margin, margin-asc, cog or name
    #[arg(long, default_value = "margin")]
    sort: ArbitrageSort,

    /// Source whose latest price is the sell price
    #[arg(long, default_value = "keepa")]
    sell_source: Source,

    /// Page number (starting at 1)
    #[arg(long, default_value_t = 1)]
    page: u64,

    /// Items per page
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    per_page: u64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

impl ArbitrageArgs {
    fn filter(&self) -> ArbitrageFilter {
        ArbitrageFilter {
            min_margin_pct: self.min_margin,
            max_cog_pct: self.max_cog,
            cog_source: self.cog_source,
            data: if self.has_data {
                DataFilter::HasData
            } else if self.missing_data {
                DataFilter::MissingData
            } else {
                DataFilter::Any
            },
            search: self.search.clone(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub(crate) enum ExcludeAction {
    /// Exclude a comparison listing from margin calculations
    Add {
        /// Listing id on its source
        listing: String,

        /// Only exclude it for this tracked item
        #[arg(long)]
        item: Option<Uuid>,

        /// Why the listing is excluded
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Lift an exclusion
    Remove {
        /// Listing id on its source
        listing: String,

        /// Lift the exclusion scoped to this tracked item
        #[arg(long)]
        item: Option<Uuid>,
    },
    /// List exclusions
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

#[derive(Debug, Tabled, Serialize)]
struct MarginRow {
    #[tabled(rename = "Item")]
    external_id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Sell")]
    sell: String,
    #[tabled(rename = "Min Cost")]
    min_cost: String,
    #[tabled(rename = "Avg Cost")]
    avg_cost: String,
    #[tabled(rename = "Margin")]
    margin: String,
    #[tabled(rename = "Margin %")]
    margin_pct: String,
    #[tabled(rename = "COG %")]
    cog_pct: String,
    #[tabled(rename = "Listings")]
    listings: usize,
    #[tabled(rename = "Excluded")]
    excluded: usize,
}

impl From<&ItemMargins> for MarginRow {
    fn from(m: &ItemMargins) -> Self {
        Self {
            external_id: m.item.external_id.clone(),
            name: truncate(&m.item.name, 40),
            sell: money(m.sell_price),
            min_cost: money(m.overall.min_cost),
            avg_cost: money(m.overall.avg_cost),
            margin: money(m.overall.margin_abs),
            margin_pct: percent(m.overall.margin_pct),
            cog_pct: percent(m.overall.cog_pct),
            listings: m.overall.listing_count,
            excluded: m.excluded,
        }
    }
}

#[derive(Debug, Tabled, Serialize)]
struct ExclusionRow {
    #[tabled(rename = "Listing")]
    listing: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Since")]
    since: String,
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}

/// Handle `arbiter arbitrage`.
pub(crate) async fn handle_arbitrage(
    args: ArbitrageArgs,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config, database_url, None).await?;
    let calculator = ArbitrageCalculator::new(session.ctx.clone()).with_sell_source(args.sell_source);

    let pagination = Pagination::new(args.page.saturating_sub(1), args.per_page);
    let view = calculator.view(&args.filter(), args.sort, pagination).await?;

    if view.items.is_empty() && matches!(args.output, OutputFormat::Table) {
        println!("No items match.");
        return Ok(());
    }

    match args.output {
        OutputFormat::Table => {
            let rows: Vec<MarginRow> = view.items.iter().map(MarginRow::from).collect();
            print_rows(&rows, args.output)?;
            println!(
                "Page {} of {} ({} items, sell price from {})",
                view.page + 1,
                view.total_pages.max(1),
                view.total,
                calculator.sell_source()
            );
        }
        OutputFormat::Json => print_json(&view.items)?,
    }
    Ok(())
}

/// JSON keeps the per-source breakdown the table leaves out.
fn print_json(items: &[ItemMargins]) -> Result<(), serde_json::Error> {
    let values: Vec<serde_json::Value> = items
        .iter()
        .map(|m| {
            serde_json::json!({
                "item_id": m.item.id,
                "external_id": m.item.external_id,
                "name": m.item.name,
                "comparison_id": m.item.comparison_id,
                "sell_price": m.sell_price,
                "overall": m.overall,
                "by_source": m.by_source,
                "excluded": m.excluded,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}

/// Handle `arbiter exclude`.
pub(crate) async fn handle_exclude(
    action: ExcludeAction,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config, database_url, None).await?;
    let calculator = ArbitrageCalculator::new(session.ctx.clone());

    match action {
        ExcludeAction::Add {
            listing,
            item,
            reason,
        } => {
            let scope = ExclusionScope::from_item(item);
            let change = calculator.exclude(&listing, scope, reason).await?;
            if change.changed {
                println!("Excluded {} ({})", listing.trim(), scope);
            } else {
                println!("{} is already excluded ({})", listing.trim(), scope);
            }
            print_recalculated(&change.recalculated)?;
        }
        ExcludeAction::Remove { listing, item } => {
            let scope = ExclusionScope::from_item(item);
            let change = calculator.restore(&listing, scope).await?;
            if change.changed {
                println!("Restored {} ({})", listing.trim(), scope);
            } else {
                println!("{} was not excluded ({})", listing.trim(), scope);
            }
            print_recalculated(&change.recalculated)?;
        }
        ExcludeAction::List { output } => {
            let exclusions =
                store::exclusions::list(session.ctx.db(), session.ctx.user_id()).await?;
            let rows: Vec<ExclusionRow> = exclusions
                .iter()
                .map(|e| ExclusionRow {
                    listing: e.listing_external_id.clone(),
                    scope: if e.is_global() {
                        "global".to_string()
                    } else {
                        e.scope_item_id.to_string()
                    },
                    reason: e.reason.clone().unwrap_or_default(),
                    since: e.created_at.format("%Y-%m-%d").to_string(),
                })
                .collect();
            print_rows(&rows, output)?;
        }
    }
    Ok(())
}

fn print_recalculated(items: &[ItemMargins]) -> Result<(), serde_json::Error> {
    if items.is_empty() {
        return Ok(());
    }
    println!("\nRecalculated margins:");
    let rows: Vec<MarginRow> = items.iter().map(MarginRow::from).collect();
    print_rows(&rows, OutputFormat::Table)
}
