//! SeaORM entity definitions for the arbiter database schema.

pub mod comparison_listing;
pub mod cross_listing;
pub mod exclusion;
pub mod item_status;
pub mod job_type;
pub mod listing_status;
pub mod platform_order;
pub mod prelude;
pub mod price_observation;
pub mod removal_entry;
pub mod source;
pub mod sync_cursor;
pub mod sync_job;
pub mod sync_status;
pub mod tracked_item;
