//! Tracked items and their lifecycle.
//!
//! Items are never deleted. Excluding an item flips its status; restoring
//! flips it back.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::item_status::{ItemStatus, MatchConfidence};
use crate::entity::source::Source;
use crate::entity::tracked_item::{ActiveModel, Column, Entity as TrackedItem, Model};

use super::errors::{Result, StoreError};

/// Record an item the user wants to watch, or refresh its name.
///
/// Keyed by `(user, external_id)`. Rediscovering an item never changes its
/// status or comparison mapping.
pub async fn discover<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Source,
    external_id: &str,
    name: &str,
) -> Result<Model> {
    let external_id = external_id.trim();
    if external_id.is_empty() {
        return Err(StoreError::invalid_input("external id must not be empty"));
    }

    let now = Utc::now().fixed_offset();
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        source: Set(source),
        external_id: Set(external_id.to_string()),
        name: Set(name.to_string()),
        status: Set(ItemStatus::Active),
        comparison_id: Set(None),
        match_confidence: Set(MatchConfidence::Unmatched),
        created_at: Set(now),
        updated_at: Set(now),
    };

    TrackedItem::insert(model)
        .on_conflict(
            OnConflict::columns([Column::UserId, Column::ExternalId])
                .update_columns([Column::Name, Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    find_by_external_id(db, user_id, external_id)
        .await?
        .ok_or_else(|| StoreError::not_found_by_key("tracked item", external_id))
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, user_id: Uuid, id: Uuid) -> Result<Model> {
    TrackedItem::find_by_id(id)
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| StoreError::not_found_by_id("tracked item", id))
}

pub async fn find_by_external_id<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    external_id: &str,
) -> Result<Option<Model>> {
    TrackedItem::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ExternalId.eq(external_id))
        .one(db)
        .await
        .map_err(StoreError::from)
}

/// Set an item's lifecycle status. Setting the current status is a no-op.
pub async fn set_status<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    id: Uuid,
    status: ItemStatus,
) -> Result<Model> {
    let item = find_by_id(db, user_id, id).await?;
    if item.status == status {
        return Ok(item);
    }

    let mut active: ActiveModel = item.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(db).await.map_err(StoreError::from)
}

/// Point an item at a comparison identifier, or clear the mapping.
pub async fn remap<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    id: Uuid,
    comparison_id: Option<String>,
    confidence: MatchConfidence,
) -> Result<Model> {
    let comparison_id = comparison_id
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let confidence = if comparison_id.is_none() {
        MatchConfidence::Unmatched
    } else if confidence == MatchConfidence::Unmatched {
        return Err(StoreError::invalid_input(
            "a comparison id needs a confidence other than none",
        ));
    } else {
        confidence
    };

    let item = find_by_id(db, user_id, id).await?;
    let mut active: ActiveModel = item.into();
    active.comparison_id = Set(comparison_id);
    active.match_confidence = Set(confidence);
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(db).await.map_err(StoreError::from)
}

/// Active items, optionally limited to one sell-side source.
pub async fn list_active<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    source: Option<Source>,
) -> Result<Vec<Model>> {
    let mut query = TrackedItem::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Status.eq(ItemStatus::Active));
    if let Some(source) = source {
        query = query.filter(Column::Source.eq(source));
    }

    query
        .order_by_asc(Column::Name)
        .order_by_asc(Column::ExternalId)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Active items that have a comparison identifier.
pub async fn list_mapped<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<Vec<Model>> {
    TrackedItem::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::Status.eq(ItemStatus::Active))
        .filter(Column::ComparisonId.is_not_null())
        .order_by_asc(Column::ExternalId)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Every item of a user, optionally in one status.
pub async fn list<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    status: Option<ItemStatus>,
) -> Result<Vec<Model>> {
    let mut query = TrackedItem::find().filter(Column::UserId.eq(user_id));
    if let Some(status) = status {
        query = query.filter(Column::Status.eq(status));
    }
    query
        .order_by_asc(Column::Name)
        .order_by_asc(Column::ExternalId)
        .all(db)
        .await
        .map_err(StoreError::from)
}

pub async fn count<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    status: Option<ItemStatus>,
) -> Result<u64> {
    let mut query = TrackedItem::find().filter(Column::UserId.eq(user_id));
    if let Some(status) = status {
        query = query.filter(Column::Status.eq(status));
    }
    query.count(db).await.map_err(StoreError::from)
}
