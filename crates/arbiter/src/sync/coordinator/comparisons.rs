use crate::platform::{ObservedListing, PlatformError, SourceAdapter};
use crate::store::{items, listings};

use super::super::context::EngineContext;
use super::super::progress::{SyncProgress, emit};
use super::super::types::SourceSyncResult;
use super::record_failed;

/// Replace each mapped item's competing listings with what the source shows
/// now. `processed` counts items, the write counts are listing rows.
pub(super) async fn comparison_pass(
    ctx: &EngineContext,
    adapter: &dyn SourceAdapter,
    result: &mut SourceSyncResult,
) {
    let source = adapter.source();

    let mapped = match items::list_mapped(ctx.db(), ctx.user_id()).await {
        Ok(mapped) => mapped,
        Err(e) => {
            result.abort(format!("could not load mapped items: {e}"));
            return;
        }
    };

    for (index, item) in mapped.iter().enumerate() {
        let Some(query) = item.comparison_id.as_deref() else {
            continue;
        };
        if ctx.is_shutdown_requested() {
            result.abort("cancelled");
            return;
        }

        result.processed += 1;
        let records = match adapter.search_listings(query).await {
            Ok(fetched) => fetched.data,
            Err(e) if e.is_pass_fatal() => {
                result.abort(e.to_string());
                return;
            }
            Err(PlatformError::NotFound { .. }) => {
                // Nothing listed: an empty replacement prunes what was there.
                result.not_found += 1;
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(source = %source, item = %item.external_id, error = %e, "Listing search failed");
                result.failed += 1;
                result.errors.push(format!("{}: {}", item.external_id, e));
                continue;
            }
        };

        emit(
            ctx.progress(),
            SyncProgress::FetchedPage {
                source,
                page: index as u32 + 1,
                count: records.len(),
            },
        );

        let mut observed: Vec<ObservedListing> = Vec::with_capacity(records.len());
        for raw in &records {
            match adapter.normalize_listing(raw) {
                Ok(listing) => observed.push(listing),
                Err(e) => record_failed(ctx, source, result, &e),
            }
        }

        let outcome = match listings::replace_for_item(
            ctx.db(),
            ctx.user_id(),
            item.id,
            source,
            &observed,
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(e) if e.is_systemic() => {
                result.abort(format!("could not persist listings: {e}"));
                return;
            }
            Err(e) => {
                result.failed += 1;
                result.errors.push(format!("{}: {}", item.external_id, e));
                continue;
            }
        };

        let counts = outcome.counts;
        result.created += counts.created;
        result.updated += counts.updated;
        result.failed += counts.failed;
        result.pruned += outcome.pruned;
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
    }
}
