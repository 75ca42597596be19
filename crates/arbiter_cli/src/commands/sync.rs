//! Order, price and comparison sync commands.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use arbiter::entity::source::Source;
use arbiter::platform::SourceAdapter;
use arbiter::sync::{PassKind, SourceSyncResult, SyncCoordinator, SyncMode, SyncSummary};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, display_errors, print_rows};
use crate::commands::shared::{Session, build_adapter, build_configured, open_session};
use crate::config::Config;

/// Sources that carry orders.
const ORDER_SOURCES: [Source; 3] = [Source::Amazon, Source::Ebay, Source::BrickLink];
/// Sources that serve price observations.
const PRICE_SOURCES: [Source; 1] = [Source::Keepa];
/// Sources searched for comparison listings.
const LISTING_SOURCES: [Source; 2] = [Source::Ebay, Source::BrickLink];

/// One source or every source that supports the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    All,
    One(Source),
}

impl Target {
    fn sources(self, supported: &[Source]) -> Vec<Source> {
        match self {
            Target::All => supported.to_vec(),
            Target::One(source) => vec![source],
        }
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Target::All)
        } else {
            s.parse().map(Target::One)
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct SyncArgs {
    /// Source to sync ("amazon", "ebay", "bricklink") or "all"
    #[arg(default_value = "all")]
    target: Target,

    /// Sync mode: "incremental" continues from the stored cursor, "full"
    /// re-reads everything and resets it
    #[arg(short, long, default_value = "incremental")]
    mode: SyncMode,

    /// Skip the per-order line item calls of sources that need them
    #[arg(long)]
    skip_line_items: bool,

    /// Only sync sources whose order job is due
    #[arg(long)]
    due_only: bool,

    /// Output format for the summary
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Args)]
pub(crate) struct HistoricalArgs {
    /// Order source to import from
    source: Source,

    /// First day of the range (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_range_start)]
    from: DateTime<Utc>,

    /// Last day of the range, inclusive (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_range_end)]
    to: DateTime<Utc>,
}

/// Row of the pass summary table.
#[derive(Debug, Tabled, Serialize)]
struct PassRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Job")]
    job: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Processed")]
    processed: usize,
    #[tabled(rename = "Created")]
    created: usize,
    #[tabled(rename = "Updated")]
    updated: usize,
    #[tabled(rename = "Failed")]
    failed: usize,
}

impl From<&SourceSyncResult> for PassRow {
    fn from(result: &SourceSyncResult) -> Self {
        Self {
            source: result.source.to_string(),
            job: result.job_type.to_string(),
            status: if result.success { "ok" } else { "failed" }.to_string(),
            processed: result.processed,
            created: result.created,
            updated: result.updated,
            failed: result.failed,
        }
    }
}

fn parse_date(s: &str, time: NaiveTime) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|date| date.and_time(time).and_utc())
        .map_err(|_| format!("Invalid date '{}': expected YYYY-MM-DD or RFC 3339", s))
}

fn parse_range_start(s: &str) -> Result<DateTime<Utc>, String> {
    parse_date(s, NaiveTime::MIN)
}

fn parse_range_end(s: &str) -> Result<DateTime<Utc>, String> {
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    parse_date(s, end_of_day)
}

fn coordinator(session: &Session, config: &Config) -> SyncCoordinator {
    SyncCoordinator::new(session.ctx.clone(), config.sync_options())
        .with_intervals(config.job_intervals())
}

/// Build adapters for `target` among the `supported` sources.
fn adapters_for(
    target: Target,
    supported: &[Source],
    config: &Config,
    session: &Session,
) -> Result<Vec<Arc<dyn SourceAdapter>>, Box<dyn std::error::Error>> {
    let adapters = match target {
        // A named source that is not configured is an error, not a skip.
        Target::One(source) => vec![build_adapter(source, config, &session.ctx)?],
        Target::All => build_configured(&target.sources(supported), config, session),
    };
    if adapters.is_empty() {
        return Err(format!(
            "No configured source supports this pass (expected one of: {})",
            supported
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
        .into());
    }
    Ok(adapters)
}

fn report(
    summary: &SyncSummary,
    session: &Session,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    session.reporter.finish();

    let rows: Vec<PassRow> = summary.results.iter().map(PassRow::from).collect();
    if rows.is_empty() {
        if session.is_tty {
            println!("Nothing to do: no pass is due.");
        } else {
            tracing::info!("No pass is due");
        }
        return Ok(());
    }

    if session.is_tty || matches!(output, OutputFormat::Json) {
        print_rows(&rows, output)?;
    } else {
        tracing::info!(
            passes = summary.results.len(),
            successful = summary.successful(),
            failed = summary.failed(),
            processed = summary.processed,
            created = summary.created,
            updated = summary.updated,
            "Sync complete"
        );
    }
    display_errors(&summary.errors, session.is_tty);

    if summary.success {
        Ok(())
    } else {
        Err(format!("{} of {} passes failed", summary.failed(), summary.results.len()).into())
    }
}

/// Handle `arbiter sync`.
pub(crate) async fn handle_sync(
    args: SyncArgs,
    config: &Config,
    database_url: &str,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config, database_url, Some(shutdown_flag)).await?;

    let mut options = config.sync_options();
    if args.skip_line_items {
        options.include_line_items = false;
    }
    let coordinator = SyncCoordinator::new(session.ctx.clone(), options)
        .with_intervals(config.job_intervals());

    let adapters = adapters_for(args.target, &ORDER_SOURCES, config, &session)?;
    let kind = PassKind::Orders(args.mode);
    let summary = if args.due_only {
        coordinator.run_due(&adapters, kind, Utc::now()).await
    } else {
        coordinator.run_all(&adapters, kind).await
    };

    report(&summary, &session, args.output)
}

/// Handle `arbiter prices`.
pub(crate) async fn handle_prices(
    source: Target,
    config: &Config,
    database_url: &str,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config, database_url, Some(shutdown_flag)).await?;
    let adapters = adapters_for(source, &PRICE_SOURCES, config, &session)?;
    let summary = coordinator(&session, config)
        .run_all(&adapters, PassKind::Prices)
        .await;
    report(&summary, &session, OutputFormat::Table)
}

/// Handle `arbiter comparisons`.
pub(crate) async fn handle_comparisons(
    source: Target,
    config: &Config,
    database_url: &str,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config, database_url, Some(shutdown_flag)).await?;
    let adapters = adapters_for(source, &LISTING_SOURCES, config, &session)?;
    let summary = coordinator(&session, config)
        .run_all(&adapters, PassKind::Comparisons)
        .await;
    report(&summary, &session, OutputFormat::Table)
}

/// Handle `arbiter historical`.
pub(crate) async fn handle_historical(
    args: HistoricalArgs,
    config: &Config,
    database_url: &str,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    if args.from > args.to {
        return Err(format!("--from {} is after --to {}", args.from, args.to).into());
    }

    let session = open_session(config, database_url, Some(shutdown_flag)).await?;
    let adapter = build_adapter(args.source, config, &session.ctx)?;
    let mode = SyncMode::Historical {
        from: args.from,
        to: args.to,
    };
    let result = coordinator(&session, config)
        .run(adapter.as_ref(), PassKind::Orders(mode))
        .await;

    report(
        &SyncSummary::from_results(vec![result]),
        &session,
        OutputFormat::Table,
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_target_parsing() {
        assert_eq!("all".parse::<Target>(), Ok(Target::All));
        assert_eq!("ALL".parse::<Target>(), Ok(Target::All));
        assert_eq!("bl".parse::<Target>(), Ok(Target::One(Source::BrickLink)));
        assert!("etsy".parse::<Target>().is_err());
    }

    #[test]
    fn test_target_sources() {
        assert_eq!(Target::All.sources(&ORDER_SOURCES), ORDER_SOURCES.to_vec());
        assert_eq!(
            Target::One(Source::Keepa).sources(&ORDER_SOURCES),
            vec![Source::Keepa]
        );
    }

    #[test]
    fn test_range_dates() {
        assert_eq!(
            parse_range_start("2025-01-01"),
            Ok(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_range_end("2025-12-31"),
            Ok(Utc.with_ymd_and_hms(2025, 12, 31, 23, 59, 59).unwrap())
        );
        assert_eq!(
            parse_range_start("2025-03-04T10:00:00+01:00"),
            Ok(Utc.with_ymd_and_hms(2025, 3, 4, 9, 0, 0).unwrap())
        );
        assert!(parse_range_end("31/12/2025").is_err());
    }

    #[test]
    fn test_pass_row_from_result() {
        let mut result = SourceSyncResult::new(Source::Ebay, arbiter::JobType::OrderSync);
        result.processed = 3;
        result.created = 2;
        result.abort("boom");
        let row = PassRow::from(&result);
        assert_eq!(row.source, "ebay");
        assert_eq!(row.status, "failed");
        assert_eq!(row.processed, 3);
        assert_eq!(row.created, 2);
    }
}
