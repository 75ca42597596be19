use arbiter::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::PassStarted {
                source,
                job_type,
                mode,
            } => {
                tracing::info!(source = %source, job = %job_type, mode = %mode, "Pass started");
            }

            SyncProgress::FetchedPage {
                source,
                page,
                count,
            } => {
                tracing::debug!(source = %source, page, count, "Fetched page");
            }

            SyncProgress::RecordFailed {
                source,
                record,
                error,
            } => {
                tracing::warn!(source = %source, record = %record, error = %error, "Record failed");
            }

            SyncProgress::PersistedBatch {
                source,
                created,
                updated,
                failed,
            } => {
                tracing::debug!(source = %source, created, updated, failed, "Persisted batch");
            }

            SyncProgress::CursorAdvanced {
                source,
                job_type,
                position,
            } => {
                tracing::debug!(source = %source, job = %job_type, position = %position, "Cursor advanced");
            }

            SyncProgress::BudgetWait {
                source,
                cost,
                waited_ms,
            } => {
                tracing::debug!(source = %source, cost, waited_ms, "Waited for token budget");
            }

            SyncProgress::Throttled {
                source,
                attempt,
                retry_after_ms,
            } => {
                tracing::warn!(
                    source = %source,
                    attempt,
                    retry_after_ms,
                    "Rate limited, backing off"
                );
            }

            SyncProgress::ReconciliationMatch {
                sale_source,
                item_key,
                order_id,
                targets,
            } => {
                let targets: Vec<String> = targets.iter().map(ToString::to_string).collect();
                tracing::info!(
                    sale_source = %sale_source,
                    item_key = %item_key,
                    order = %order_id,
                    targets = %targets.join(","),
                    "Cross-listed item sold"
                );
            }

            SyncProgress::PassComplete {
                source,
                job_type,
                success,
                processed,
                created,
                updated,
                failed,
            } => {
                if success {
                    tracing::info!(source = %source, job = %job_type, processed, created, updated, failed, "Pass complete");
                } else {
                    tracing::warn!(source = %source, job = %job_type, processed, created, updated, failed, "Pass failed");
                }
            }

            SyncProgress::SyncingSources { count } => {
                tracing::info!(count, "Syncing sources");
            }

            SyncProgress::SyncSourcesComplete { successful, failed } => {
                tracing::info!(successful, failed, "Sync complete");
            }

            SyncProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
