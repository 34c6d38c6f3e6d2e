//! Data models for drawbook

mod draft;
mod folder;
mod page;

pub use draft::LocalDraft;
pub use folder::{normalize_folder_name, CachedFolder, Folder, FolderId};
pub use page::{display_page_name, PageContent, PageId, PageRecord, PageSummary};
