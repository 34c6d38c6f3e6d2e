//! Error types for drawbook-core

use thiserror::Error;

use crate::models::PageId;
use crate::remote::RemoteError;

/// Result type alias using drawbook-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in drawbook-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Page, folder, or draft not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote fetch failed while loading or refreshing a page
    #[error("Failed to load page {page_id}: {source}")]
    Load {
        page_id: PageId,
        #[source]
        source: RemoteError,
    },

    /// Remote push failed; the local draft is still cached
    #[error("Failed to save page {page_id} to the server: {source}")]
    Write {
        page_id: PageId,
        #[source]
        source: RemoteError,
    },

    /// Any other remote record store failure
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Diagram conversion failed
    #[error("Diagram conversion failed: {0}")]
    Diagram(String),
}
