//! Operator side of the removal queue.

use crate::entity::listing_status::RemovalStatus;
use crate::entity::removal_entry;
use crate::store::{self, PaginatedResult, Pagination, cross_listings, removals};
use crate::sync::EngineContext;

/// What resolving one entry changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOutcome {
    pub entry: removal_entry::Model,
    /// The item had no pending entries left and moved to `sold`.
    pub sale_finished: bool,
}

/// Lists and resolves pending removal entries.
#[derive(Clone)]
pub struct RemovalReview {
    ctx: EngineContext,
}

impl RemovalReview {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    pub async fn list_pending(
        &self,
        pagination: Pagination,
    ) -> store::Result<PaginatedResult<removal_entry::Model>> {
        removals::list_pending(self.ctx.db(), self.ctx.user_id(), pagination).await
    }

    /// The operator removed the listing on the target source.
    pub async fn complete(&self, id: uuid::Uuid) -> store::Result<ResolveOutcome> {
        self.resolve(id, RemovalStatus::Completed).await
    }

    /// The operator decided no removal is needed.
    pub async fn dismiss(&self, id: uuid::Uuid) -> store::Result<ResolveOutcome> {
        self.resolve(id, RemovalStatus::Dismissed).await
    }

    async fn resolve(&self, id: uuid::Uuid, to: RemovalStatus) -> store::Result<ResolveOutcome> {
        let db = self.ctx.db();
        let entry = removals::resolve(db, self.ctx.user_id(), id, to).await?;

        let remaining = removals::count_pending_for(db, entry.cross_listing_id).await?;
        let sale_finished = remaining == 0
            && cross_listings::finish_sale(db, entry.cross_listing_id).await?;

        tracing::info!(
            entry = %entry.id,
            item_key = %entry.item_key,
            target = %entry.removal_target,
            status = %to,
            sale_finished,
            "Removal entry resolved"
        );
        Ok(ResolveOutcome {
            entry,
            sale_finished,
        })
    }
}
