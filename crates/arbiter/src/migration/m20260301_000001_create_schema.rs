//! Initial migration to create the arbiter database schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_tracked_items(manager).await?;
        self.create_price_observations(manager).await?;
        self.create_comparison_listings(manager).await?;
        self.create_exclusions(manager).await?;
        self.create_platform_orders(manager).await?;
        self.create_sync_cursors(manager).await?;
        self.create_cross_listings(manager).await?;
        self.create_removal_queue(manager).await?;
        self.create_sync_jobs(manager).await?;
        self.create_sync_status(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncStatus::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SyncJobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RemovalQueue::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CrossListings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SyncCursors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PlatformOrders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Exclusions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ComparisonListings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PriceObservations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TrackedItems::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_tracked_items(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrackedItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TrackedItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TrackedItems::UserId).uuid().not_null())
                    .col(ColumnDef::new(TrackedItems::Source).string().not_null())
                    .col(ColumnDef::new(TrackedItems::ExternalId).string().not_null())
                    .col(ColumnDef::new(TrackedItems::Name).string().not_null())
                    .col(
                        ColumnDef::new(TrackedItems::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(TrackedItems::ComparisonId).string().null())
                    .col(
                        ColumnDef::new(TrackedItems::MatchConfidence)
                            .string()
                            .not_null()
                            .default("none"),
                    )
                    .col(
                        ColumnDef::new(TrackedItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(TrackedItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Natural key: (user_id, external_id)
        manager
            .create_index(
                Index::create()
                    .name("idx_tracked_items_user_external")
                    .table(TrackedItems::Table)
                    .col(TrackedItems::UserId)
                    .col(TrackedItems::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tracked_items_user_status")
                    .table(TrackedItems::Table)
                    .col(TrackedItems::UserId)
                    .col(TrackedItems::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_price_observations(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PriceObservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PriceObservations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PriceObservations::TrackedItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PriceObservations::Source).string().not_null())
                    .col(
                        ColumnDef::new(PriceObservations::PriceMinor)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PriceObservations::Currency)
                            .string()
                            .not_null()
                            .default("GBP"),
                    )
                    .col(ColumnDef::new(PriceObservations::OfferCount).integer().null())
                    .col(
                        ColumnDef::new(PriceObservations::SecondaryMetric)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PriceObservations::ObservedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceObservations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_price_observations_item")
                            .from(PriceObservations::Table, PriceObservations::TrackedItemId)
                            .to(TrackedItems::Table, TrackedItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One observation slot per (item, source)
        manager
            .create_index(
                Index::create()
                    .name("idx_price_observations_item_source")
                    .table(PriceObservations::Table)
                    .col(PriceObservations::TrackedItemId)
                    .col(PriceObservations::Source)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_comparison_listings(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ComparisonListings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ComparisonListings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ComparisonListings::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ComparisonListings::TrackedItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ComparisonListings::Source).string().not_null())
                    .col(
                        ColumnDef::new(ComparisonListings::ExternalId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ComparisonListings::Title).text().null())
                    .col(
                        ColumnDef::new(ComparisonListings::PriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ComparisonListings::ShippingMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ComparisonListings::TotalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ComparisonListings::Currency)
                            .string()
                            .not_null()
                            .default("GBP"),
                    )
                    .col(ColumnDef::new(ComparisonListings::Condition).string().null())
                    .col(
                        ColumnDef::new(ComparisonListings::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ComparisonListings::ObservedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comparison_listings_item")
                            .from(ComparisonListings::Table, ComparisonListings::TrackedItemId)
                            .to(TrackedItems::Table, TrackedItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comparison_listings_item_source_external")
                    .table(ComparisonListings::Table)
                    .col(ComparisonListings::TrackedItemId)
                    .col(ComparisonListings::Source)
                    .col(ComparisonListings::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Exclusions look listings up by external id across items
        manager
            .create_index(
                Index::create()
                    .name("idx_comparison_listings_user_external")
                    .table(ComparisonListings::Table)
                    .col(ComparisonListings::UserId)
                    .col(ComparisonListings::ExternalId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_exclusions(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Exclusions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Exclusions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Exclusions::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Exclusions::ListingExternalId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Exclusions::ScopeItemId).uuid().not_null())
                    .col(ColumnDef::new(Exclusions::Reason).text().null())
                    .col(
                        ColumnDef::new(Exclusions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_exclusions_user_listing_scope")
                    .table(Exclusions::Table)
                    .col(Exclusions::UserId)
                    .col(Exclusions::ListingExternalId)
                    .col(Exclusions::ScopeItemId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_platform_orders(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PlatformOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlatformOrders::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PlatformOrders::UserId).uuid().not_null())
                    .col(ColumnDef::new(PlatformOrders::Source).string().not_null())
                    .col(ColumnDef::new(PlatformOrders::ExternalId).string().not_null())
                    .col(
                        ColumnDef::new(PlatformOrders::OrderDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PlatformOrders::Counterparty).string().null())
                    .col(
                        ColumnDef::new(PlatformOrders::Status)
                            .string()
                            .not_null()
                            .default("Unknown"),
                    )
                    .col(ColumnDef::new(PlatformOrders::TotalMinor).big_integer().null())
                    .col(ColumnDef::new(PlatformOrders::Currency).string().null())
                    .col(
                        ColumnDef::new(PlatformOrders::LineItems)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .col(
                        ColumnDef::new(PlatformOrders::LineItemsLoaded)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PlatformOrders::SourceUpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PlatformOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PlatformOrders::SyncedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Natural key: (user_id, source, external_id)
        manager
            .create_index(
                Index::create()
                    .name("idx_platform_orders_natural_key")
                    .table(PlatformOrders::Table)
                    .col(PlatformOrders::UserId)
                    .col(PlatformOrders::Source)
                    .col(PlatformOrders::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Reconciler keyset scan
        manager
            .create_index(
                Index::create()
                    .name("idx_platform_orders_stream")
                    .table(PlatformOrders::Table)
                    .col(PlatformOrders::UserId)
                    .col(PlatformOrders::Source)
                    .col(PlatformOrders::SourceUpdatedAt)
                    .col(PlatformOrders::ExternalId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_sync_cursors(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncCursors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncCursors::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncCursors::UserId).uuid().not_null())
                    .col(ColumnDef::new(SyncCursors::Source).string().not_null())
                    .col(ColumnDef::new(SyncCursors::JobType).string().not_null())
                    .col(
                        ColumnDef::new(SyncCursors::PositionAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SyncCursors::PositionToken).string().null())
                    .col(
                        ColumnDef::new(SyncCursors::HistoricalCompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(SyncCursors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_cursors_key")
                    .table(SyncCursors::Table)
                    .col(SyncCursors::UserId)
                    .col(SyncCursors::Source)
                    .col(SyncCursors::JobType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_cross_listings(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrossListings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrossListings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CrossListings::UserId).uuid().not_null())
                    .col(ColumnDef::new(CrossListings::ItemKey).string().not_null())
                    .col(ColumnDef::new(CrossListings::Title).text().null())
                    .col(
                        ColumnDef::new(CrossListings::ListedOn)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .col(
                        ColumnDef::new(CrossListings::Status)
                            .string()
                            .not_null()
                            .default("published"),
                    )
                    .col(ColumnDef::new(CrossListings::SoldOn).string().null())
                    .col(ColumnDef::new(CrossListings::SoldOrderRef).string().null())
                    .col(
                        ColumnDef::new(CrossListings::SoldAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(CrossListings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CrossListings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cross_listings_user_key")
                    .table(CrossListings::Table)
                    .col(CrossListings::UserId)
                    .col(CrossListings::ItemKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_removal_queue(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RemovalQueue::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RemovalQueue::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RemovalQueue::UserId).uuid().not_null())
                    .col(ColumnDef::new(RemovalQueue::CrossListingId).uuid().not_null())
                    .col(ColumnDef::new(RemovalQueue::ItemKey).string().not_null())
                    .col(ColumnDef::new(RemovalQueue::SaleSource).string().not_null())
                    .col(ColumnDef::new(RemovalQueue::RemovalTarget).string().not_null())
                    .col(
                        ColumnDef::new(RemovalQueue::OrderExternalId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RemovalQueue::SalePriceMinor)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(RemovalQueue::Currency).string().null())
                    .col(
                        ColumnDef::new(RemovalQueue::SaleDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RemovalQueue::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(RemovalQueue::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RemovalQueue::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_removal_queue_cross_listing")
                            .from(RemovalQueue::Table, RemovalQueue::CrossListingId)
                            .to(CrossListings::Table, CrossListings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One entry per (item, sale, target): a replayed sale cannot enqueue twice
        manager
            .create_index(
                Index::create()
                    .name("idx_removal_queue_sale_target")
                    .table(RemovalQueue::Table)
                    .col(RemovalQueue::CrossListingId)
                    .col(RemovalQueue::SaleSource)
                    .col(RemovalQueue::OrderExternalId)
                    .col(RemovalQueue::RemovalTarget)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_removal_queue_user_status")
                    .table(RemovalQueue::Table)
                    .col(RemovalQueue::UserId)
                    .col(RemovalQueue::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_sync_jobs(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncJobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncJobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SyncJobs::UserId).uuid().not_null())
                    .col(ColumnDef::new(SyncJobs::Source).string().not_null())
                    .col(ColumnDef::new(SyncJobs::JobType).string().not_null())
                    .col(ColumnDef::new(SyncJobs::Status).string().not_null())
                    .col(
                        ColumnDef::new(SyncJobs::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::FinishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(SyncJobs::DurationMs).big_integer().null())
                    .col(
                        ColumnDef::new(SyncJobs::Processed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::Created)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::Updated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncJobs::Failed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SyncJobs::ErrorSummary).text().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_jobs_user_started")
                    .table(SyncJobs::Table)
                    .col(SyncJobs::UserId)
                    .col((SyncJobs::StartedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_sync_status(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncStatus::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SyncStatus::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SyncStatus::UserId).uuid().not_null())
                    .col(ColumnDef::new(SyncStatus::Source).string().not_null())
                    .col(ColumnDef::new(SyncStatus::JobType).string().not_null())
                    .col(ColumnDef::new(SyncStatus::LastJobId).uuid().not_null())
                    .col(ColumnDef::new(SyncStatus::Status).string().not_null())
                    .col(
                        ColumnDef::new(SyncStatus::LastRunAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncStatus::LastSuccessAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(SyncStatus::LastDurationMs).big_integer().null())
                    .col(
                        ColumnDef::new(SyncStatus::Processed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncStatus::Created)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncStatus::Updated)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncStatus::Failed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(SyncStatus::LastError).text().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sync_status_key")
                    .table(SyncStatus::Table)
                    .col(SyncStatus::UserId)
                    .col(SyncStatus::Source)
                    .col(SyncStatus::JobType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum TrackedItems {
    Table,
    Id,
    UserId,
    Source,
    ExternalId,
    Name,
    Status,
    ComparisonId,
    MatchConfidence,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PriceObservations {
    Table,
    Id,
    TrackedItemId,
    Source,
    PriceMinor,
    Currency,
    OfferCount,
    SecondaryMetric,
    ObservedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ComparisonListings {
    Table,
    Id,
    UserId,
    TrackedItemId,
    Source,
    ExternalId,
    Title,
    PriceMinor,
    ShippingMinor,
    TotalMinor,
    Currency,
    Condition,
    IsActive,
    ObservedAt,
}

#[derive(DeriveIden)]
enum Exclusions {
    Table,
    Id,
    UserId,
    ListingExternalId,
    ScopeItemId,
    Reason,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PlatformOrders {
    Table,
    Id,
    UserId,
    Source,
    ExternalId,
    OrderDate,
    Counterparty,
    Status,
    TotalMinor,
    Currency,
    LineItems,
    LineItemsLoaded,
    SourceUpdatedAt,
    CreatedAt,
    SyncedAt,
}

#[derive(DeriveIden)]
enum SyncCursors {
    Table,
    Id,
    UserId,
    Source,
    JobType,
    PositionAt,
    PositionToken,
    HistoricalCompletedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CrossListings {
    Table,
    Id,
    UserId,
    ItemKey,
    Title,
    ListedOn,
    Status,
    SoldOn,
    SoldOrderRef,
    SoldAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "removal_queue")]
enum RemovalQueue {
    Table,
    Id,
    UserId,
    CrossListingId,
    ItemKey,
    SaleSource,
    RemovalTarget,
    OrderExternalId,
    SalePriceMinor,
    Currency,
    SaleDate,
    Status,
    CreatedAt,
    ResolvedAt,
}

#[derive(DeriveIden)]
enum SyncJobs {
    Table,
    Id,
    UserId,
    Source,
    JobType,
    Status,
    StartedAt,
    FinishedAt,
    DurationMs,
    Processed,
    Created,
    Updated,
    Failed,
    ErrorSummary,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "sync_status")]
enum SyncStatus {
    Table,
    Id,
    UserId,
    Source,
    JobType,
    LastJobId,
    Status,
    LastRunAt,
    LastSuccessAt,
    LastDurationMs,
    Processed,
    Created,
    Updated,
    Failed,
    LastError,
}
