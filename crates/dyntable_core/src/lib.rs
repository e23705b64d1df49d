//! Data-access wrapper over a schema-less key-value/document table store.
//! Centralizes error mapping, batching and pagination plumbing so callers
//! do not repeat it against the store's native API.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{Item, ItemValidationError, Value, ID_FIELD};
pub use repo::{RepoError, RepoResult, TableRepository, UpdateRequest, DEFAULT_PAGE_LIMIT};
pub use store::sqlite::{SqliteStore, SqliteTableClient};
pub use store::{
    FilterExpression, ScanCursor, ScanPage, StoreClient, StoreError, StoreResult, TableClient,
    UpdateInput, BATCH_MAX_ITEMS,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
