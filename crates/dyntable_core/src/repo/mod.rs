//! Repository layer over the store-client seam.

pub mod table_repo;

pub use table_repo::{
    RepoError, RepoResult, TableRepository, UpdateRequest, DEFAULT_PAGE_LIMIT,
};
