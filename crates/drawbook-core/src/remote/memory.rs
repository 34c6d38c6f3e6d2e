//! In-process remote store for tests and offline embedding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{NewPage, RemoteError, RemoteResult, RemoteStore};
use crate::models::{Folder, FolderId, PageContent, PageId, PageRecord, PageSummary};
use crate::util::{Clock, SystemClock};

#[derive(Default)]
struct MemoryState {
    pages: HashMap<PageId, (String, PageRecord)>,
    folders: HashMap<FolderId, (String, Folder)>,
}

/// Remote store kept entirely in memory.
///
/// Counts page writes and can be told to fail reads or writes, which makes it
/// the reference double for reconciliation tests.
pub struct MemoryRemoteStore {
    state: Mutex<MemoryState>,
    clock: Arc<dyn Clock>,
    page_writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Use a custom clock for server-side `updated_at` stamps
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            clock,
            page_writes: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Seed a page record exactly as given, timestamp included
    pub fn insert_page(&self, owner_id: &str, record: PageRecord) {
        if let Ok(mut state) = self.state.lock() {
            state.pages.insert(record.id, (owner_id.to_string(), record));
        }
    }

    /// Number of `set_page` calls that reached the store
    pub fn page_writes(&self) -> usize {
        self.page_writes.load(Ordering::SeqCst)
    }

    /// Make every read fail with an API error
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with an API error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> RemoteResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| RemoteError::Api("memory store lock poisoned".to_string()))
    }

    fn check_read(&self) -> RemoteResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RemoteError::Api("simulated read failure (503)".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> RemoteResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Api("simulated write failure (503)".to_string()));
        }
        Ok(())
    }

    fn update_folder(
        &self,
        id: &FolderId,
        apply: impl FnOnce(&mut Folder),
    ) -> RemoteResult<Folder> {
        self.check_write()?;
        let now = self.clock.now_millis();
        let mut state = self.lock()?;
        let (_, folder) = state
            .folders
            .get_mut(id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        apply(folder);
        folder.updated_at = now;
        Ok(folder.clone())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get_page(&self, id: &PageId) -> RemoteResult<PageRecord> {
        self.check_read()?;
        let state = self.lock()?;
        state
            .pages
            .get(id)
            .map(|(_, record)| record.clone())
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn set_page(&self, id: &PageId, content: &PageContent, name: &str) -> RemoteResult<i64> {
        self.page_writes.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        let now = self.clock.now_millis();
        let mut state = self.lock()?;
        let (_, record) = state
            .pages
            .get_mut(id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        record.content = content.clone();
        record.name = name.to_string();
        record.updated_at = now;
        Ok(now)
    }

    async fn create_page(&self, owner_id: &str, page: NewPage) -> RemoteResult<PageRecord> {
        self.check_write()?;
        let record = PageRecord {
            id: PageId::new(),
            name: page.name,
            content: page.content,
            updated_at: self.clock.now_millis(),
            folder_id: page.folder_id,
        };
        let mut state = self.lock()?;
        if let Some(folder_id) = record.folder_id {
            if !state.folders.contains_key(&folder_id) {
                return Err(RemoteError::NotFound(folder_id.to_string()));
            }
        }
        state
            .pages
            .insert(record.id, (owner_id.to_string(), record.clone()));
        Ok(record)
    }

    async fn delete_page(&self, id: &PageId) -> RemoteResult<()> {
        self.check_write()?;
        let mut state = self.lock()?;
        state
            .pages
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn list_pages(&self, owner_id: &str) -> RemoteResult<Vec<PageSummary>> {
        self.check_read()?;
        let state = self.lock()?;
        let mut pages = state
            .pages
            .values()
            .filter(|(owner, _)| owner == owner_id)
            .map(|(_, record)| PageSummary::from(record))
            .collect::<Vec<_>>();
        pages.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(pages)
    }

    async fn list_folders(&self, owner_id: &str) -> RemoteResult<Vec<Folder>> {
        self.check_read()?;
        let state = self.lock()?;
        let mut folders = state
            .folders
            .values()
            .filter(|(owner, _)| owner == owner_id)
            .map(|(_, folder)| folder.clone())
            .collect::<Vec<_>>();
        folders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(folders)
    }

    async fn create_folder(&self, owner_id: &str, name: &str, icon: &str) -> RemoteResult<Folder> {
        self.check_write()?;
        let now = self.clock.now_millis();
        let folder = Folder {
            id: FolderId::new(),
            name: name.to_string(),
            icon: icon.to_string(),
            created_at: now,
            updated_at: now,
        };
        let mut state = self.lock()?;
        state
            .folders
            .insert(folder.id, (owner_id.to_string(), folder.clone()));
        Ok(folder)
    }

    async fn rename_folder(&self, id: &FolderId, name: &str) -> RemoteResult<Folder> {
        self.update_folder(id, |folder| folder.name = name.to_string())
    }

    async fn set_folder_icon(&self, id: &FolderId, icon: &str) -> RemoteResult<Folder> {
        self.update_folder(id, |folder| folder.icon = icon.to_string())
    }

    async fn delete_folder(&self, id: &FolderId) -> RemoteResult<()> {
        self.check_write()?;
        let mut state = self.lock()?;
        if state.folders.remove(id).is_none() {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        for (_, record) in state.pages.values_mut() {
            if record.folder_id.as_ref() == Some(id) {
                record.folder_id = None;
            }
        }
        Ok(())
    }
}
