use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{Set, TransactionTrait};
use uuid::Uuid;

use crate::entity::job_type::JobType;
use crate::entity::listing_status::{CrossListingStatus, RemovalStatus};
use crate::entity::platform_order;
use crate::entity::removal_entry;
use crate::entity::source::Source;
use crate::money::to_minor;
use crate::notify::{NotificationEvent, notify_best_effort};
use crate::platform::{CursorPosition, LineItem, NormalizedOrder, SourceAdapter};
use crate::status::{JobIntervals, SyncStatusTracker};
use crate::store::{StoreError, cross_listings, cursors, jobs, orders, removals};
use crate::sync::{EngineContext, SyncProgress, emit};

use super::matcher::{item_key, line_price, removal_targets};
use super::types::{ReconcileOptions, ReconcileResult, SaleMatch, SourceReconcileResult};

/// Turns sales of cross-listed items into removal queue entries.
///
/// Reads the stored order stream of each source behind its own
/// `reconciliation` cursor, independent of the order sync cursor.
#[derive(Clone)]
pub struct CrossPlatformReconciler {
    ctx: EngineContext,
    options: ReconcileOptions,
    tracker: SyncStatusTracker,
    adapters: HashMap<Source, Arc<dyn SourceAdapter>>,
}

impl CrossPlatformReconciler {
    pub fn new(ctx: EngineContext, options: ReconcileOptions) -> Self {
        let tracker = SyncStatusTracker::new(ctx.db_handle(), ctx.user_id(), JobIntervals::default());
        Self {
            ctx,
            options,
            tracker,
            adapters: HashMap::new(),
        }
    }

    /// Use `adapter` to load line items for stored orders that only have a
    /// summary.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.adapters.insert(adapter.source(), adapter);
        self
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    /// Reconcile each source in turn.
    pub async fn run(&self, sources: &[Source]) -> ReconcileResult {
        let mut results = Vec::with_capacity(sources.len());
        for source in sources {
            results.push(self.reconcile_source(*source).await);
        }
        ReconcileResult::from_results(results)
    }

    /// Process every stored order of `source` after the reconciliation
    /// cursor.
    ///
    /// A failing order is recorded and the rest of the batch still runs, but
    /// the cursor stops just before the first failure so the next run
    /// retries it. Orders after it are replayed harmlessly.
    #[tracing::instrument(skip(self), fields(user = %self.ctx.user_id()))]
    pub async fn reconcile_source(&self, source: Source) -> SourceReconcileResult {
        let mut result = SourceReconcileResult::new(source);
        emit(
            self.ctx.progress(),
            SyncProgress::PassStarted {
                source,
                job_type: JobType::Reconciliation,
                mode: "reconcile".to_string(),
            },
        );

        let already_failing = self.previous_failures(source).await;
        let job = match self.tracker.start(source, JobType::Reconciliation).await {
            Ok(job) => job,
            Err(e) => {
                result.abort(format!("could not record job: {e}"));
                self.report(&result);
                return result;
            }
        };

        let budget = self.options.pass_timeout;
        if tokio::time::timeout(budget, self.poll(source, &already_failing, &mut result))
            .await
            .is_err()
        {
            result.abort(format!("pass timed out after {}s", budget.as_secs()));
        }

        let counts = result.counts();
        let finished = if result.success {
            job.complete_with_errors(&result.errors, counts).await
        } else {
            job.fail(&result.errors, counts).await
        };
        if let Err(e) = finished {
            tracing::warn!(source = %source, error = %e, "Could not finalize reconciliation job");
        }

        self.report(&result);
        result
    }

    /// Orders that were failing when the last run of `source` finished.
    async fn previous_failures(&self, source: Source) -> HashSet<String> {
        match jobs::latest_for(self.ctx.db(), self.ctx.user_id(), source, JobType::Reconciliation)
            .await
        {
            Ok(Some(status)) => status
                .last_error
                .as_deref()
                .map(failed_order_ids)
                .unwrap_or_default(),
            Ok(None) => HashSet::new(),
            Err(e) => {
                tracing::debug!(source = %source, error = %e, "Could not read last reconciliation run");
                HashSet::new()
            }
        }
    }

    async fn poll(
        &self,
        source: Source,
        already_failing: &HashSet<String>,
        result: &mut SourceReconcileResult,
    ) {
        let db = self.ctx.db();
        let user_id = self.ctx.user_id();

        let mut after =
            match cursors::position(db, user_id, source, JobType::Reconciliation).await {
                Ok(pos) => pos,
                Err(e) => {
                    result.abort(format!("could not read cursor: {e}"));
                    return;
                }
            };

        let mut in_prefix = true;
        loop {
            if self.ctx.is_shutdown_requested() {
                result.abort("cancelled");
                return;
            }

            let batch = match orders::find_after(
                db,
                user_id,
                source,
                after.as_ref(),
                self.options.batch_size,
            )
            .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    result.abort(format!("could not read orders: {e}"));
                    return;
                }
            };
            if batch.is_empty() {
                return;
            }
            let full_batch = batch.len() as u64 >= self.options.batch_size;

            let mut last_ok: Option<CursorPosition> = None;
            for model in &batch {
                result.processed += 1;
                match self.process_order(model).await {
                    Ok(matches) => {
                        if in_prefix {
                            last_ok = Some(orders::position(model));
                        }
                        result.matched += matches.len();
                        result.queued += matches.iter().map(|m| m.queued).sum::<u64>();
                    }
                    Err(e) => {
                        in_prefix = false;
                        result.failed += 1;
                        tracing::warn!(source = %source, order = %model.external_id, error = %e, "Could not reconcile order");
                        result.errors.push(format!("{}: {}", model.external_id, e));
                        if already_failing.contains(&model.external_id) {
                            continue;
                        }
                        notify_best_effort(
                            self.ctx.notifier(),
                            NotificationEvent::ReconciliationFailed {
                                sale_source: source,
                                order_id: model.external_id.clone(),
                                error: e.to_string(),
                            },
                        )
                        .await;
                    }
                }
            }

            if let Some(pos) = last_ok {
                match cursors::advance(db, user_id, source, JobType::Reconciliation, &pos).await {
                    Ok(true) => {
                        emit(
                            self.ctx.progress(),
                            SyncProgress::CursorAdvanced {
                                source,
                                job_type: JobType::Reconciliation,
                                position: pos.at.to_rfc3339(),
                            },
                        );
                        result.cursor = Some(pos);
                    }
                    Ok(false) => {}
                    Err(e) => {
                        result.abort(format!("could not advance cursor: {e}"));
                        return;
                    }
                }
            }

            if !in_prefix || !full_batch {
                return;
            }
            after = batch.last().map(orders::position);
        }
    }

    /// Match one order's lines against the cross-listing registry.
    async fn process_order(
        &self,
        model: &platform_order::Model,
    ) -> Result<Vec<SaleMatch>, StoreError> {
        let order = orders::to_normalized(model)?;
        let lines = self.line_items(order).await?;

        let mut matches = Vec::new();
        for line in &lines {
            let Some(key) = item_key(&line.sku, &self.options.sku_prefix) else {
                continue;
            };
            if let Some(sale) = self.claim(model, line, key).await? {
                matches.push(sale);
            }
        }
        Ok(matches)
    }

    /// Line items of `order`, loading them through the source's adapter
    /// when only the summary is stored.
    async fn line_items(&self, order: NormalizedOrder) -> Result<Vec<LineItem>, StoreError> {
        if order.line_items_loaded {
            return Ok(order.line_items);
        }
        let adapter = self.adapters.get(&order.source).ok_or_else(|| {
            StoreError::invalid_input(format!(
                "line items not loaded and no {} adapter configured",
                order.source
            ))
        })?;

        let fetched = adapter
            .fetch_line_items(&order)
            .await
            .map_err(|e| StoreError::invalid_input(format!("could not load line items: {e}")))?;

        let mut loaded = order;
        loaded.line_items = fetched.data;
        loaded.line_items_loaded = true;
        orders::upsert_orders(self.ctx.db(), self.ctx.user_id(), std::slice::from_ref(&loaded))
            .await?;
        Ok(loaded.line_items)
    }

    /// Claim a published item for this sale and queue its removals.
    ///
    /// Returns `None` when the key is unknown, the sale was handled before
    /// (even if the item has since been relisted), or the item already left
    /// `published`.
    async fn claim(
        &self,
        order: &platform_order::Model,
        line: &LineItem,
        key: &str,
    ) -> Result<Option<SaleMatch>, StoreError> {
        let user_id = self.ctx.user_id();
        let Some(listing) = cross_listings::find_by_key(self.ctx.db(), user_id, key).await? else {
            tracing::debug!(item_key = key, "No cross-listing registered");
            return Ok(None);
        };
        if listing.last_sale_is(order.source, &order.external_id)
            || removals::exists_for_sale(self.ctx.db(), listing.id, order.source, &order.external_id)
                .await?
        {
            tracing::debug!(
                item_key = key,
                order = %order.external_id,
                "Sale already handled"
            );
            return Ok(None);
        }
        if listing.status != CrossListingStatus::Published {
            return Ok(None);
        }

        let sold_at = order.order_date.with_timezone(&Utc);
        let targets = removal_targets(&listing.listed_sources(), order.source);
        let next = if targets.is_empty() {
            CrossListingStatus::Sold
        } else {
            CrossListingStatus::PendingRemoval
        };
        let sale = cross_listings::SaleRecord {
            sold_on: order.source,
            order_ref: &order.external_id,
            sold_at,
        };
        let price = line_price(line, orders::total(order));

        let txn = self.ctx.db().begin().await?;
        if !cross_listings::claim_sale(&txn, listing.id, &sale, next).await? {
            return Ok(None);
        }
        let now = Utc::now().fixed_offset();
        let entries = targets
            .iter()
            .map(|target| removal_entry::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                cross_listing_id: Set(listing.id),
                item_key: Set(listing.item_key.clone()),
                sale_source: Set(order.source),
                removal_target: Set(*target),
                order_external_id: Set(order.external_id.clone()),
                sale_price_minor: Set(price.and_then(to_minor)),
                currency: Set(order.currency.clone()),
                sale_date: Set(sold_at.fixed_offset()),
                status: Set(RemovalStatus::Pending),
                created_at: Set(now),
                resolved_at: Set(None),
            })
            .collect();
        let queued = removals::enqueue(&txn, entries).await?;
        if queued == 0 && !targets.is_empty() {
            // Every entry already existed: this sale was queued before.
            txn.rollback().await?;
            return Ok(None);
        }
        txn.commit().await?;

        tracing::info!(
            item_key = %listing.item_key,
            sale_source = %order.source,
            order = %order.external_id,
            queued,
            "Cross-listed item sold"
        );
        emit(
            self.ctx.progress(),
            SyncProgress::ReconciliationMatch {
                sale_source: order.source,
                item_key: listing.item_key.clone(),
                order_id: order.external_id.clone(),
                targets: targets.clone(),
            },
        );
        if !targets.is_empty() {
            notify_best_effort(
                self.ctx.notifier(),
                NotificationEvent::RemovalNeeded {
                    item_key: listing.item_key.clone(),
                    sale_source: order.source,
                    order_id: order.external_id.clone(),
                    sale_price: price,
                    sold_at,
                    targets: targets.clone(),
                },
            )
            .await;
        }

        Ok(Some(SaleMatch {
            item_key: listing.item_key,
            order_id: order.external_id.clone(),
            targets,
            queued,
        }))
    }

    fn report(&self, result: &SourceReconcileResult) {
        emit(
            self.ctx.progress(),
            SyncProgress::PassComplete {
                source: result.source,
                job_type: JobType::Reconciliation,
                success: result.success,
                processed: result.processed,
                created: result.queued as usize,
                updated: result.matched,
                failed: result.failed,
            },
        );
        tracing::info!(
            source = %result.source,
            processed = result.processed,
            matched = result.matched,
            queued = result.queued,
            failed = result.failed,
            "Reconciliation complete"
        );
    }
}

/// Order ids named in a stored job error summary (`"<id>: <error>; ..."`).
fn failed_order_ids(summary: &str) -> HashSet<String> {
    summary
        .split("; ")
        .filter_map(|entry| entry.split_once(": ").map(|(id, _)| id.to_string()))
        .collect()
}
