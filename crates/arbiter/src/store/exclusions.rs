//! User exclusions of comparison listing ids.
//!
//! An exclusion is keyed by `(user, listing_external_id, scope_item_id)`.
//! The global scope is stored as the nil UUID so that the unique index
//! covers it on every backend (NULLs never collide in a unique index).

use chrono::Utc;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::exclusion::{ActiveModel, Column, Entity as Exclusion, Model};

use super::errors::{Result, StoreError};

/// Scope id used for exclusions that apply to every item.
pub const GLOBAL_SCOPE: Uuid = Uuid::nil();

/// Where an exclusion applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionScope {
    Global,
    Item(Uuid),
}

impl ExclusionScope {
    pub fn from_item(item: Option<Uuid>) -> Self {
        match item {
            Some(id) if !id.is_nil() => Self::Item(id),
            _ => Self::Global,
        }
    }

    pub fn scope_id(self) -> Uuid {
        match self {
            Self::Global => GLOBAL_SCOPE,
            Self::Item(id) => id,
        }
    }
}

impl std::fmt::Display for ExclusionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Item(id) => write!(f, "item {id}"),
        }
    }
}

/// Exclude a listing id. Returns `false` if it was already excluded in
/// that scope; the existing row is left untouched.
pub async fn add<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    listing_external_id: &str,
    scope: ExclusionScope,
    reason: Option<String>,
) -> Result<bool> {
    let listing_external_id = listing_external_id.trim();
    if listing_external_id.is_empty() {
        return Err(StoreError::invalid_input("listing id must not be empty"));
    }

    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        listing_external_id: Set(listing_external_id.to_string()),
        scope_item_id: Set(scope.scope_id()),
        reason: Set(reason),
        created_at: Set(Utc::now().fixed_offset()),
    };

    let inserted = Exclusion::insert(model)
        .on_conflict(
            OnConflict::columns([Column::UserId, Column::ListingExternalId, Column::ScopeItemId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(inserted > 0)
}

/// Remove an exclusion. Returns `false` if there was nothing to remove.
pub async fn remove<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    listing_external_id: &str,
    scope: ExclusionScope,
) -> Result<bool> {
    let result = Exclusion::delete_many()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ListingExternalId.eq(listing_external_id.trim()))
        .filter(Column::ScopeItemId.eq(scope.scope_id()))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// All exclusions for a user.
pub async fn list<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<Vec<Model>> {
    Exclusion::find()
        .filter(Column::UserId.eq(user_id))
        .order_by_asc(Column::ListingExternalId)
        .order_by_asc(Column::ScopeItemId)
        .all(db)
        .await
        .map_err(StoreError::from)
}

/// Exclusions that can affect the given items: global ones plus those
/// scoped to one of the items.
pub async fn for_items<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    item_ids: &[Uuid],
) -> Result<Vec<Model>> {
    let mut scopes = Condition::any().add(Column::ScopeItemId.eq(GLOBAL_SCOPE));
    if !item_ids.is_empty() {
        scopes = scopes.add(Column::ScopeItemId.is_in(item_ids.iter().copied()));
    }

    Exclusion::find()
        .filter(Column::UserId.eq(user_id))
        .filter(scopes)
        .all(db)
        .await
        .map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;

    #[test]
    fn scope_from_item_treats_nil_as_global() {
        assert_eq!(ExclusionScope::from_item(None), ExclusionScope::Global);
        assert_eq!(
            ExclusionScope::from_item(Some(Uuid::nil())),
            ExclusionScope::Global
        );
        let id = Uuid::new_v4();
        assert_eq!(ExclusionScope::from_item(Some(id)), ExclusionScope::Item(id));
        assert_eq!(ExclusionScope::Item(id).scope_id(), id);
        assert!(ExclusionScope::Global.scope_id().is_nil());
    }

    #[tokio::test]
    async fn add_reports_existing_exclusion_as_noop() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([
                MockExecResult {
                    rows_affected: 1,
                    last_insert_id: 0,
                },
                MockExecResult {
                    rows_affected: 0,
                    last_insert_id: 0,
                },
            ])
            .into_connection();

        let user = Uuid::nil();
        assert!(
            add(&db, user, "394820193", ExclusionScope::Global, None)
                .await
                .unwrap()
        );
        assert!(
            !add(&db, user, "394820193", ExclusionScope::Global, None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn add_rejects_blank_listing_id() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let err = add(&db, Uuid::nil(), " ", ExclusionScope::Global, None)
            .await
            .expect_err("blank");
        assert!(matches!(err, StoreError::InvalidInput { .. }));
    }
}
