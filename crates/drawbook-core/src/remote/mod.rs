//! Remote record store: the hosted backend holding pages and folders.
//!
//! Consumed only through [`RemoteStore`]. Every call returns a result value;
//! nothing in this crate retries a failed remote call on its own.

mod memory;
mod supabase;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Folder, FolderId, PageContent, PageId, PageRecord, PageSummary};

pub use memory::MemoryRemoteStore;
pub use supabase::{normalize_rest_url, SupabaseRecordStore};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote record not found: {0}")]
    NotFound(String),
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unexpected remote payload: {0}")]
    InvalidPayload(String),
    #[error("Remote API error: {0}")]
    Api(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Fields for a page that does not exist remotely yet
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewPage {
    pub name: String,
    pub folder_id: Option<FolderId>,
    pub content: PageContent,
}

/// Read/write access to remote pages and folders.
///
/// No consistency contract beyond "the last write is visible to the next read".
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch a full page record
    async fn get_page(&self, id: &PageId) -> RemoteResult<PageRecord>;

    /// Overwrite a page's content and name; returns the new remote `updated_at`
    async fn set_page(&self, id: &PageId, content: &PageContent, name: &str) -> RemoteResult<i64>;

    /// Create a page owned by `owner_id`
    async fn create_page(&self, owner_id: &str, page: NewPage) -> RemoteResult<PageRecord>;

    /// Delete a page
    async fn delete_page(&self, id: &PageId) -> RemoteResult<()>;

    /// Page metadata for an owner, most recently updated first
    async fn list_pages(&self, owner_id: &str) -> RemoteResult<Vec<PageSummary>>;

    /// Folders for an owner, oldest first
    async fn list_folders(&self, owner_id: &str) -> RemoteResult<Vec<Folder>>;

    /// Create a folder
    async fn create_folder(&self, owner_id: &str, name: &str, icon: &str) -> RemoteResult<Folder>;

    /// Rename a folder
    async fn rename_folder(&self, id: &FolderId, name: &str) -> RemoteResult<Folder>;

    /// Change a folder's icon
    async fn set_folder_icon(&self, id: &FolderId, icon: &str) -> RemoteResult<Folder>;

    /// Delete a folder; its pages are kept and become unfiled
    async fn delete_folder(&self, id: &FolderId) -> RemoteResult<()>;
}
