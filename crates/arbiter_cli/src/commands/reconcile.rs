//! Reconciliation and removal queue commands.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use arbiter::entity::removal_entry;
use arbiter::entity::source::Source;
use arbiter::money::from_minor;
use arbiter::reconcile::{
    CrossPlatformReconciler, ReconcileResult, RemovalReview, ResolveOutcome,
    SourceReconcileResult,
};
use arbiter::store::Pagination;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::commands::output::{OutputFormat, display_errors, money, print_rows};
use crate::commands::shared::{build_adapter, open_session};
use crate::config::Config;

/// Sources whose orders can claim a cross-listed item.
const SALE_SOURCES: [Source; 3] = [Source::Amazon, Source::Ebay, Source::BrickLink];

#[derive(Debug, Subcommand)]
pub(crate) enum RemovalAction {
    /// List pending removals
    List {
        /// Page number (starting at 1)
        #[arg(long, default_value_t = 1)]
        page: u64,

        /// Entries per page
        #[arg(long, default_value_t = 50)]
        per_page: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Mark a removal done after taking the listing down
    Complete {
        /// Removal entry id
        id: Uuid,
    },
    /// Drop a removal that needs no action
    Dismiss {
        /// Removal entry id
        id: Uuid,
    },
}

#[derive(Debug, Tabled, Serialize)]
struct ReconcileRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Orders")]
    processed: usize,
    #[tabled(rename = "Matched")]
    matched: usize,
    #[tabled(rename = "Queued")]
    queued: u64,
    #[tabled(rename = "Failed")]
    failed: usize,
}

impl From<&SourceReconcileResult> for ReconcileRow {
    fn from(result: &SourceReconcileResult) -> Self {
        Self {
            source: result.source.to_string(),
            status: if result.success { "ok" } else { "failed" }.to_string(),
            processed: result.processed,
            matched: result.matched,
            queued: result.queued,
            failed: result.failed,
        }
    }
}

#[derive(Debug, Tabled, Serialize)]
struct RemovalRow {
    #[tabled(rename = "Id")]
    id: Uuid,
    #[tabled(rename = "Item")]
    item_key: String,
    #[tabled(rename = "Sold On")]
    sale_source: String,
    #[tabled(rename = "Remove From")]
    removal_target: String,
    #[tabled(rename = "Order")]
    order: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Sold At")]
    sold_at: String,
}

impl From<&removal_entry::Model> for RemovalRow {
    fn from(entry: &removal_entry::Model) -> Self {
        let amount = money(entry.sale_price_minor.map(from_minor));
        let price = match (&entry.currency, amount.as_str()) {
            (Some(currency), amount) if amount != "-" => format!("{} {}", amount, currency),
            (_, amount) => amount.to_string(),
        };
        Self {
            id: entry.id,
            item_key: entry.item_key.clone(),
            sale_source: entry.sale_source.to_string(),
            removal_target: entry.removal_target.to_string(),
            order: entry.order_external_id.clone(),
            price,
            sold_at: entry.sale_date.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Handle `arbiter reconcile`.
pub(crate) async fn handle_reconcile(
    sources: Vec<Source>,
    config: &Config,
    database_url: &str,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let sources = if sources.is_empty() {
        SALE_SOURCES.to_vec()
    } else {
        sources
    };

    let session = open_session(config, database_url, Some(shutdown_flag)).await?;
    let mut reconciler =
        CrossPlatformReconciler::new(session.ctx.clone(), config.reconcile_options());

    // Adapters only serve line items missing from stored orders; a source
    // without credentials reconciles from what is stored.
    for &source in &sources {
        match build_adapter(source, config, &session.ctx) {
            Ok(adapter) => reconciler = reconciler.with_adapter(adapter),
            Err(e) => tracing::debug!(source = %source, error = %e, "No adapter for line item lookups"),
        }
    }

    let result = reconciler.run(&sources).await;
    session.reporter.finish();
    report(&result, session.is_tty)
}

fn report(result: &ReconcileResult, is_tty: bool) -> Result<(), Box<dyn std::error::Error>> {
    if is_tty {
        let rows: Vec<ReconcileRow> = result.results.iter().map(ReconcileRow::from).collect();
        print_rows(&rows, OutputFormat::Table)?;
        if result.queued > 0 {
            println!(
                "\n{} removal(s) queued. Review them with `arbiter removals list`.",
                result.queued
            );
        }
    } else {
        tracing::info!(
            processed = result.processed,
            matched = result.matched,
            queued = result.queued,
            "Reconciliation complete"
        );
    }
    display_errors(&result.errors, is_tty);

    if result.success {
        Ok(())
    } else {
        Err("Reconciliation finished with errors".into())
    }
}

/// Handle `arbiter removals`.
pub(crate) async fn handle_removals(
    action: RemovalAction,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config, database_url, None).await?;
    let review = RemovalReview::new(session.ctx.clone());

    match action {
        RemovalAction::List {
            page,
            per_page,
            output,
        } => {
            let pending = review
                .list_pending(Pagination::new(page.saturating_sub(1), per_page))
                .await?;
            if pending.items.is_empty() && matches!(output, OutputFormat::Table) {
                println!("No pending removals.");
                return Ok(());
            }
            let rows: Vec<RemovalRow> = pending.items.iter().map(RemovalRow::from).collect();
            print_rows(&rows, output)?;
            if matches!(output, OutputFormat::Table) && pending.total_pages > 1 {
                println!(
                    "Page {} of {} ({} pending)",
                    pending.page + 1,
                    pending.total_pages,
                    pending.total
                );
            }
        }
        RemovalAction::Complete { id } => {
            let outcome = review.complete(id).await?;
            print_outcome("Completed", &outcome);
        }
        RemovalAction::Dismiss { id } => {
            let outcome = review.dismiss(id).await?;
            print_outcome("Dismissed", &outcome);
        }
    }
    Ok(())
}

fn print_outcome(verb: &str, outcome: &ResolveOutcome) {
    println!(
        "{} removal of {} from {}",
        verb, outcome.entry.item_key, outcome.entry.removal_target
    );
    if outcome.sale_finished {
        println!("All removals for {} are resolved; item marked sold.", outcome.entry.item_key);
    }
}
