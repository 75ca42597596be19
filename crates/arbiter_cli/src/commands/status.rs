//! Job status command.

use std::collections::{HashMap, HashSet};

use arbiter::entity::job_type::JobType;
use arbiter::entity::source::Source;
use arbiter::entity::sync_status;
use arbiter::status::SyncStatusTracker;
use arbiter::store;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, print_rows};
use crate::commands::shared::open_session;
use crate::config::Config;

/// Jobs a configured deployment schedules, shown even before their first run.
const SCHEDULED: [(Source, JobType); 9] = [
    (Source::Amazon, JobType::OrderSync),
    (Source::Ebay, JobType::OrderSync),
    (Source::BrickLink, JobType::OrderSync),
    (Source::Keepa, JobType::PriceSync),
    (Source::Ebay, JobType::ComparisonSync),
    (Source::BrickLink, JobType::ComparisonSync),
    (Source::Amazon, JobType::Reconciliation),
    (Source::Ebay, JobType::Reconciliation),
    (Source::BrickLink, JobType::Reconciliation),
];

#[derive(Debug, Tabled, Serialize)]
struct StatusRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Job")]
    job: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Last Run")]
    last_run: String,
    #[tabled(rename = "Last Success")]
    last_success: String,
    #[tabled(rename = "Took")]
    duration: String,
    #[tabled(rename = "Processed")]
    processed: i32,
    #[tabled(rename = "Failed")]
    failed: i32,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Last Error")]
    last_error: String,
}

impl StatusRow {
    fn never_run(source: Source, job_type: JobType, due: bool) -> Self {
        Self {
            source: source.to_string(),
            job: job_type.to_string(),
            status: "never run".to_string(),
            last_run: "-".to_string(),
            last_success: "-".to_string(),
            duration: "-".to_string(),
            processed: 0,
            failed: 0,
            due: due_cell(due),
            last_error: String::new(),
        }
    }

    fn from_model(row: &sync_status::Model, due: bool) -> Self {
        Self {
            source: row.source.to_string(),
            job: row.job_type.to_string(),
            status: row.status.to_string(),
            last_run: timestamp(Some(row.last_run_at)),
            last_success: timestamp(row.last_success_at),
            duration: row
                .last_duration_ms
                .map_or_else(|| "-".to_string(), format_duration),
            processed: row.processed,
            failed: row.failed,
            due: due_cell(due),
            last_error: row
                .last_error
                .as_deref()
                .map(|e| e.lines().next().unwrap_or_default().to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Tabled, Serialize)]
struct CursorRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Job")]
    job: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "History Imported")]
    historical: String,
}

fn due_cell(due: bool) -> String {
    if due { "yes" } else { "no" }.to_string()
}

fn timestamp(at: Option<DateTime<FixedOffset>>) -> String {
    at.map_or_else(
        || "-".to_string(),
        |at| at.with_timezone(&Utc).format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn format_duration(ms: i64) -> String {
    match ms {
        ms if ms < 1_000 => format!("{}ms", ms),
        ms if ms < 60_000 => format!("{:.1}s", ms as f64 / 1000.0),
        ms => format!("{}m{:02}s", ms / 60_000, (ms % 60_000) / 1000),
    }
}

/// Handle `arbiter status`.
pub(crate) async fn handle_status(
    output: OutputFormat,
    config: &Config,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = open_session(config, database_url, None).await?;
    let db = session.ctx.db();
    let user_id = session.ctx.user_id();
    let tracker = SyncStatusTracker::new(session.ctx.db_handle(), user_id, config.job_intervals());

    let latest = store::jobs::latest(db, user_id).await?;
    let by_key: HashMap<(Source, JobType), &sync_status::Model> = latest
        .iter()
        .map(|row| ((row.source, row.job_type), row))
        .collect();

    let mut candidates: Vec<(Source, JobType)> =
        SCHEDULED.iter().copied().chain(by_key.keys().copied()).collect();
    candidates.sort_by_key(|(source, job_type)| (*source, job_type.as_str()));
    candidates.dedup();
    let due: HashSet<(Source, JobType)> = tracker
        .due_jobs(&candidates, Utc::now())
        .await?
        .into_iter()
        .collect();

    let rows: Vec<StatusRow> = candidates
        .iter()
        .map(|key| {
            let is_due = due.contains(key);
            match by_key.get(key) {
                Some(row) => StatusRow::from_model(row, is_due),
                None => StatusRow::never_run(key.0, key.1, is_due),
            }
        })
        .collect();

    let cursors: Vec<CursorRow> = store::cursors::list(db, user_id)
        .await?
        .into_iter()
        .map(|c| CursorRow {
            source: c.source.to_string(),
            job: c.job_type.to_string(),
            position: timestamp(Some(c.position_at)),
            token: c.position_token.unwrap_or_default(),
            historical: timestamp(c.historical_completed_at),
        })
        .collect();

    match output {
        OutputFormat::Table => {
            print_rows(&rows, output)?;
            if !cursors.is_empty() {
                println!("\nCursors:");
                print_rows(&cursors, output)?;
            }
        }
        OutputFormat::Json => {
            let value = serde_json::json!({ "jobs": rows, "cursors": cursors });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(250), "250ms");
        assert_eq!(format_duration(4_200), "4.2s");
        assert_eq!(format_duration(125_000), "2m05s");
    }

    #[test]
    fn test_never_run_row() {
        let row = StatusRow::never_run(Source::Keepa, JobType::PriceSync, true);
        assert_eq!(row.status, "never run");
        assert_eq!(row.due, "yes");
        assert_eq!(row.last_run, "-");
    }

    #[test]
    fn test_scheduled_jobs_are_unique() {
        let unique: HashSet<_> = SCHEDULED.iter().collect();
        assert_eq!(unique.len(), SCHEDULED.len());
    }
}
