// ── Session data store ──
//
// Keyed entity collections with push-based change notification.

mod collection;
mod data_store;
mod refresh;

pub use data_store::DataStore;
pub(crate) use refresh::RefreshSnapshot;

#[cfg(test)]
pub(crate) use data_store::tests as fixtures;
