//! Process-wide local draft cache.
//!
//! Every mounted page editor and every list view shares one [`DraftStore`],
//! passed around as `Arc<dyn DraftStore>`. Entries are immutable: a write
//! replaces the whole `Arc<LocalDraft>`, so a reader never observes a
//! half-updated draft.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::models::{LocalDraft, PageId};

/// Key-value store of drafts keyed by page id
pub trait DraftStore: Send + Sync {
    /// Current draft for a page
    fn get(&self, page_id: &PageId) -> Result<Option<Arc<LocalDraft>>>;

    /// Replace the draft for `draft.page_id`
    fn set(&self, draft: LocalDraft) -> Result<Arc<LocalDraft>>;

    /// Remove the draft for a page; returns whether one existed
    fn delete(&self, page_id: &PageId) -> Result<bool>;

    /// All drafts, most recently captured first
    fn list(&self) -> Result<Vec<Arc<LocalDraft>>>;
}

/// In-memory backend, used by tests and short-lived embeddings
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    entries: RwLock<HashMap<PageId, Arc<LocalDraft>>>,
}

impl MemoryDraftStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> Error {
    Error::Database("draft cache lock poisoned".to_string())
}

impl DraftStore for MemoryDraftStore {
    fn get(&self, page_id: &PageId) -> Result<Option<Arc<LocalDraft>>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(page_id).cloned())
    }

    fn set(&self, draft: LocalDraft) -> Result<Arc<LocalDraft>> {
        let draft = Arc::new(draft);
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(draft.page_id, Arc::clone(&draft));
        Ok(draft)
    }

    fn delete(&self, page_id: &PageId) -> Result<bool> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        Ok(entries.remove(page_id).is_some())
    }

    fn list(&self) -> Result<Vec<Arc<LocalDraft>>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        let mut drafts = entries.values().cloned().collect::<Vec<_>>();
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(drafts)
    }
}
