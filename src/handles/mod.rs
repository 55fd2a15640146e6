//! Handle store and clear value cache
//!
//! Both are keyed by `LogicalQuery` and owned by the orchestrator. The
//! freshness invariant ties them together: a clear value is presentable only
//! while its source handle is the store's current handle for the same query.

pub mod clear;
pub mod store;

pub use clear::ClearValueCache;
pub use store::HandleStore;
