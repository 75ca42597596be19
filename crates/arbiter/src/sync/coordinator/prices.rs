use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::platform::{PlatformError, PriceSnapshot, SourceAdapter};
use crate::store::{items, prices};

use super::super::context::EngineContext;
use super::super::progress::{SyncProgress, emit};
use super::super::types::SourceSyncResult;
use super::record_failed;

/// Refresh the price observation slot of every active tracked item.
pub(super) async fn price_pass(
    ctx: &EngineContext,
    adapter: &dyn SourceAdapter,
    result: &mut SourceSyncResult,
) {
    let source = adapter.source();

    let tracked = match items::list_active(ctx.db(), ctx.user_id(), None).await {
        Ok(tracked) => tracked,
        Err(e) => {
            result.abort(format!("could not load tracked items: {e}"));
            return;
        }
    };
    let by_external: HashMap<String, Uuid> = tracked
        .into_iter()
        .map(|item| (item.external_id, item.id))
        .collect();

    let mut ids: Vec<String> = by_external.keys().cloned().collect();
    ids.sort();

    let batch_size = adapter.max_batch_size().max(1);
    for (index, chunk) in ids.chunks(batch_size).enumerate() {
        if ctx.is_shutdown_requested() {
            result.abort("cancelled");
            return;
        }

        result.processed += chunk.len();
        let records = match adapter.fetch_batch(chunk).await {
            Ok(fetched) => fetched.data,
            Err(e) if e.is_pass_fatal() => {
                result.abort(e.to_string());
                return;
            }
            Err(e) => {
                tracing::warn!(source = %source, size = chunk.len(), error = %e, "Price batch failed");
                result.failed += chunk.len();
                result.errors.push(format!("batch {}: {}", chunk.join(","), e));
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

        let mut seen: HashSet<&str> = HashSet::with_capacity(chunk.len());
        let mut observations: Vec<(Uuid, PriceSnapshot)> = Vec::with_capacity(records.len());
        for raw in &records {
            match adapter.normalize_price(raw) {
                Ok(snapshot) => match by_external.get_key_value(&snapshot.external_id) {
                    Some((key, item_id)) => {
                        seen.insert(key.as_str());
                        observations.push((*item_id, snapshot));
                    }
                    None => tracing::debug!(
                        source = %source,
                        id = %snapshot.external_id,
                        "Snapshot for an id that was not requested"
                    ),
                },
                Err(e) => {
                    seen.extend(failed_id(&e, chunk));
                    record_failed(ctx, source, result, &e);
                }
            }
        }
        result.not_found += chunk
            .iter()
            .filter(|id| !seen.contains(id.as_str()))
            .count();

        let counts = match prices::upsert_observations(ctx.db(), source, &observations).await {
            Ok(counts) => counts,
            Err(e) => {
                result.abort(format!("could not persist prices: {e}"));
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
    }
}

/// The requested id a normalization failure belongs to, so it is not also
/// counted as a miss.
fn failed_id<'a>(err: &PlatformError, chunk: &'a [String]) -> Option<&'a str> {
    match err {
        PlatformError::Normalization { record, .. } => chunk
            .iter()
            .find(|id| *id == record)
            .map(String::as_str),
        _ => None,
    }
}
