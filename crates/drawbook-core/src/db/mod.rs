//! Local `SQLite` cache for drafts and folder metadata

mod connection;
mod draft_repository;
mod folder_cache_repository;
mod migrations;

pub use connection::Database;
pub use draft_repository::{DraftRepository, SqliteDraftRepository};
pub use folder_cache_repository::{FolderCacheRepository, SqliteFolderCacheRepository};
