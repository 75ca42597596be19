pub(crate) mod arbitrage;
pub(crate) mod items;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod output;
pub(crate) mod reconcile;
pub(crate) mod shared;
pub(crate) mod status;
pub(crate) mod sync;
