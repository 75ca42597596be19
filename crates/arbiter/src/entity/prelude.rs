//! Common re-exports for convenient entity usage.

pub use super::comparison_listing::{
    ActiveModel as ComparisonListingActiveModel, Column as ComparisonListingColumn,
    Entity as ComparisonListing, Model as ComparisonListingModel,
};
pub use super::cross_listing::{
    ActiveModel as CrossListingActiveModel, Column as CrossListingColumn, Entity as CrossListing,
    Model as CrossListingModel,
};
pub use super::exclusion::{
    ActiveModel as ExclusionActiveModel, Column as ExclusionColumn, Entity as Exclusion,
    Model as ExclusionModel,
};
pub use super::item_status::{ItemStatus, MatchConfidence};
pub use super::job_type::{JobStatus, JobType};
pub use super::listing_status::{CrossListingStatus, RemovalStatus};
pub use super::platform_order::{
    ActiveModel as PlatformOrderActiveModel, Column as PlatformOrderColumn,
    Entity as PlatformOrder, Model as PlatformOrderModel,
};
pub use super::price_observation::{
    ActiveModel as PriceObservationActiveModel, Column as PriceObservationColumn,
    Entity as PriceObservation, Model as PriceObservationModel,
};
pub use super::removal_entry::{
    ActiveModel as RemovalEntryActiveModel, Column as RemovalEntryColumn, Entity as RemovalEntry,
    Model as RemovalEntryModel,
};
pub use super::source::Source;
pub use super::sync_cursor::{
    ActiveModel as SyncCursorActiveModel, Column as SyncCursorColumn, Entity as SyncCursor,
    Model as SyncCursorModel,
};
pub use super::sync_job::{
    ActiveModel as SyncJobActiveModel, Column as SyncJobColumn, Entity as SyncJob,
    Model as SyncJobModel,
};
pub use super::sync_status::{
    ActiveModel as SyncStatusActiveModel, Column as SyncStatusColumn, Entity as SyncStatus,
    Model as SyncStatusModel,
};
pub use super::tracked_item::{
    ActiveModel as TrackedItemActiveModel, Column as TrackedItemColumn, Entity as TrackedItem,
    Model as TrackedItemModel,
};
