use chrono::Utc;

use crate::entity::job_type::JobType;
use crate::entity::source::Source;
use crate::platform::{CursorPosition, NormalizedOrder, OrderFilter, PlatformError, SourceAdapter};
use crate::store::{cursors, orders};

use super::super::context::EngineContext;
use super::super::progress::{SyncProgress, emit};
use super::super::types::{SourceSyncResult, SyncMode, SyncOptions};
use super::record_failed;

/// Page through a source's orders and upsert them.
///
/// Returns early with `result` marked failed on any pass-level error; pages
/// committed before that point stay committed and the cursor reflects
/// exactly those pages.
pub(super) async fn order_pass(
    ctx: &EngineContext,
    adapter: &dyn SourceAdapter,
    mode: SyncMode,
    options: &SyncOptions,
    result: &mut SourceSyncResult,
) {
    let source = adapter.source();
    let pass_start = Utc::now();

    let cursor = match cursors::position(ctx.db(), ctx.user_id(), source, JobType::OrderSync).await
    {
        Ok(c) => c,
        Err(e) => {
            result.abort(format!("could not read cursor: {e}"));
            return;
        }
    };

    let mut filter = match mode {
        SyncMode::Incremental => adapter.build_incremental_filter(cursor.as_ref()),
        SyncMode::Full => OrderFilter::default(),
        SyncMode::Historical { from, to } => OrderFilter::range(from, to),
    };
    let skip_until = match mode {
        SyncMode::Incremental => cursor,
        _ => None,
    };

    let mut page_no = 0u32;
    loop {
        if ctx.is_shutdown_requested() {
            result.abort("cancelled");
            return;
        }

        page_no += 1;
        let page = match adapter.list_orders(&filter, options.page_limit).await {
            Ok(fetched) => fetched.data,
            Err(e) => {
                result.abort(e.to_string());
                return;
            }
        };

        emit(
            ctx.progress(),
            SyncProgress::FetchedPage {
                source,
                page: page_no,
                count: page.records.len(),
            },
        );

        let mut batch: Vec<NormalizedOrder> = Vec::with_capacity(page.records.len());
        for raw in &page.records {
            result.processed += 1;
            match adapter.normalize_order(raw) {
                Ok(order) => {
                    if skip_until.as_ref().is_some_and(|c| order.position() <= *c) {
                        tracing::trace!(source = %source, order = %order.external_id, "Already past cursor");
                        continue;
                    }
                    batch.push(order);
                }
                Err(e) => record_failed(ctx, source, result, &e),
            }
        }

        if options.include_line_items
            && let Err(e) = load_line_items(adapter, &mut batch, result).await
        {
            result.abort(e.to_string());
            return;
        }

        let counts = match orders::upsert_orders(ctx.db(), ctx.user_id(), &batch).await {
            Ok(counts) => counts,
            Err(e) => {
                result.abort(format!("could not persist page {page_no}: {e}"));
                return;
            }
        };
        result.created += counts.created;
        result.updated += counts.updated;
        result.failed += counts.failed;
        emit(
            ctx.progress(),
            SyncProgress::PersistedBatch {
                source,
                created: counts.created,
                updated: counts.updated,
                failed: counts.failed,
            },
        );
        result.errors.extend(counts.errors);

        if matches!(mode, SyncMode::Incremental)
            && let Some(latest) = batch.iter().map(NormalizedOrder::position).max()
            && !advance(ctx, source, JobType::OrderSync, latest, result).await
        {
            return;
        }

        match page.next_page {
            Some(token) => filter = filter.next_page(token),
            None => break,
        }
    }

    match mode {
        SyncMode::Incremental => {}
        SyncMode::Full => {
            advance(ctx, source, JobType::OrderSync, CursorPosition::at(pass_start), result).await;
        }
        SyncMode::Historical { to, .. } => {
            if let Err(e) =
                cursors::mark_historical_complete(ctx.db(), ctx.user_id(), source, to).await
            {
                result.abort(format!("could not record historical completion: {e}"));
            }
        }
    }
}

/// Fill in line items for orders that came back as summaries.
///
/// A pass-fatal error is returned; anything else is recorded against the
/// order, which is then stored as a summary.
async fn load_line_items(
    adapter: &dyn SourceAdapter,
    batch: &mut [NormalizedOrder],
    result: &mut SourceSyncResult,
) -> Result<(), PlatformError> {
    for order in batch.iter_mut().filter(|o| !o.line_items_loaded) {
        match adapter.fetch_line_items(order).await {
            Ok(fetched) => {
                order.line_items = fetched.data;
                order.line_items_loaded = true;
            }
            Err(e) if e.is_pass_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(order = %order.external_id, error = %e, "Line items unavailable");
                result
                    .errors
                    .push(format!("{}: line items: {}", order.external_id, e));
            }
        }
    }
    Ok(())
}

/// Move the cursor after a committed page. Returns `false` when the pass
/// must stop.
async fn advance(
    ctx: &EngineContext,
    source: Source,
    job_type: JobType,
    to: CursorPosition,
    result: &mut SourceSyncResult,
) -> bool {
    match cursors::advance(ctx.db(), ctx.user_id(), source, job_type, &to).await {
        Ok(moved) => {
            if moved {
                emit(
                    ctx.progress(),
                    SyncProgress::CursorAdvanced {
                        source,
                        job_type,
                        position: to.at.to_rfc3339(),
                    },
                );
                result.cursor = Some(to);
            }
            true
        }
        Err(e) => {
            result.abort(format!("could not advance cursor: {e}"));
            false
        }
    }
}
