//! Cross-platform reconciliation: "sold here, remove there".
//!
//! Cross-listed items carry a SKU of the form `<prefix><item key>` on every
//! source. When a stored order contains such a SKU and the item is still
//! `published`, the reconciler moves the item to `pending_removal` and
//! queues one removal entry per other source it is listed on. Entries are
//! resolved by an operator through [`RemovalReview`]; once none are pending
//! the item becomes `sold`.
//!
//! ```text
//! published ──sale on A──▶ pending_removal ──all entries resolved──▶ sold
//! ```
//!
//! Replaying an order is a no-op: the claim only succeeds from `published`
//! and entries are keyed by (item, sale source, order, target).

mod matcher;
mod reconciler;
mod review;
mod types;

pub use matcher::{item_key, line_price, removal_targets};
pub use reconciler::CrossPlatformReconciler;
pub use review::{RemovalReview, ResolveOutcome};
pub use types::{
    DEFAULT_BATCH_SIZE, DEFAULT_SKU_PREFIX, ReconcileOptions, ReconcileResult, SaleMatch,
    SourceReconcileResult,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::source::Source;

    #[test]
    fn result_prefixes_errors_with_source() {
        let ok = SourceReconcileResult::new(Source::Amazon);
        let mut bad = SourceReconcileResult::new(Source::Ebay);
        bad.processed = 2;
        bad.failed = 1;
        bad.errors.push("12-345: line items not loaded".to_string());

        let result = ReconcileResult::from_results(vec![ok, bad]);
        assert!(result.success);
        assert_eq!(result.processed, 2);
        assert_eq!(result.errors, vec!["ebay: 12-345: line items not loaded".to_string()]);
    }

    #[test]
    fn aborted_source_fails_the_run() {
        let mut bad = SourceReconcileResult::new(Source::BrickLink);
        bad.abort("cancelled");
        let result = ReconcileResult::from_results(vec![bad]);
        assert!(!result.success);
    }

    #[test]
    fn default_options() {
        let options = ReconcileOptions::default();
        assert_eq!(options.sku_prefix, "SYNC-");
        assert_eq!(options.batch_size, 100);
    }
}
