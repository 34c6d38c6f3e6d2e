//! Lazily refreshed listings of an owner's pages and folders.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, Mutex};

use crate::invalidation::{Invalidation, InvalidationBus};
use crate::models::{Folder, FolderId, PageSummary};
use crate::remote::RemoteStore;
use crate::Result;

struct ListingState {
    receiver: broadcast::Receiver<Invalidation>,
    pages: Option<Vec<PageSummary>>,
    folders: Option<Vec<Folder>>,
}

impl ListingState {
    fn drain(&mut self) {
        loop {
            match self.receiver.try_recv() {
                Ok(invalidation) => {
                    if invalidation.affects_pages() {
                        self.pages = None;
                    }
                    if invalidation.affects_folders() {
                        self.folders = None;
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("Listing cache lagged by {skipped} signals; dropping all");
                    self.pages = None;
                    self.folders = None;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

/// Cached listings for one owner.
///
/// Any invalidation seen on the bus marks the affected list stale; the next
/// read refetches it from the remote.
pub struct ListingCache {
    owner_id: String,
    remote: Arc<dyn RemoteStore>,
    state: Mutex<ListingState>,
}

impl ListingCache {
    #[must_use]
    pub fn new(
        owner_id: impl Into<String>,
        remote: Arc<dyn RemoteStore>,
        bus: &InvalidationBus,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            remote,
            state: Mutex::new(ListingState {
                receiver: bus.subscribe(),
                pages: None,
                folders: None,
            }),
        }
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Page summaries, most recently updated first
    pub async fn pages(&self) -> Result<Vec<PageSummary>> {
        let mut state = self.state.lock().await;
        state.drain();
        if let Some(pages) = &state.pages {
            return Ok(pages.clone());
        }
        let pages = self.remote.list_pages(&self.owner_id).await?;
        tracing::debug!("Fetched {} pages for {}", pages.len(), self.owner_id);
        state.pages = Some(pages.clone());
        Ok(pages)
    }

    /// Folders, oldest first
    pub async fn folders(&self) -> Result<Vec<Folder>> {
        let mut state = self.state.lock().await;
        state.drain();
        if let Some(folders) = &state.folders {
            return Ok(folders.clone());
        }
        let folders = self.remote.list_folders(&self.owner_id).await?;
        tracing::debug!("Fetched {} folders for {}", folders.len(), self.owner_id);
        state.folders = Some(folders.clone());
        Ok(folders)
    }

    /// Pages filed under `folder_id`; `None` selects unfiled pages
    pub async fn pages_in_folder(&self, folder_id: Option<FolderId>) -> Result<Vec<PageSummary>> {
        Ok(self
            .pages()
            .await?
            .into_iter()
            .filter(|page| page.folder_id == folder_id)
            .collect())
    }

    /// Number of pages in every known folder, zero counts included
    pub async fn folder_page_counts(&self) -> Result<BTreeMap<FolderId, usize>> {
        let folders = self.folders().await?;
        let pages = self.pages().await?;

        let mut counts = folders
            .iter()
            .map(|folder| (folder.id, 0))
            .collect::<BTreeMap<_, _>>();
        for folder_id in pages.iter().filter_map(|page| page.folder_id) {
            if let Some(count) = counts.get_mut(&folder_id) {
                *count += 1;
            }
        }
        Ok(counts)
    }

    pub async fn is_pages_stale(&self) -> bool {
        let mut state = self.state.lock().await;
        state.drain();
        state.pages.is_none()
    }

    pub async fn is_folders_stale(&self) -> bool {
        let mut state = self.state.lock().await;
        state.drain();
        state.folders.is_none()
    }

    /// Drop both lists
    pub async fn invalidate_all(&self) {
        let mut state = self.state.lock().await;
        state.pages = None;
        state.folders = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageId;
    use crate::remote::{MemoryRemoteStore, NewPage};

    const OWNER: &str = "owner";

    fn cache(remote: &Arc<MemoryRemoteStore>, bus: &InvalidationBus) -> ListingCache {
        ListingCache::new(OWNER, remote.clone(), bus)
    }

    #[tokio::test]
    async fn cached_pages_stay_until_invalidated() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let bus = InvalidationBus::new();
        let listing = cache(&remote, &bus);

        assert!(listing.pages().await.unwrap().is_empty());
        assert!(!listing.is_pages_stale().await);

        let created = remote.create_page(OWNER, NewPage::default()).await.unwrap();
        assert!(listing.pages().await.unwrap().is_empty());

        bus.publish(Invalidation::PageCreated(created.id));
        assert!(listing.is_pages_stale().await);
        assert_eq!(listing.pages().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn folder_signal_leaves_page_list_alone() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let bus = InvalidationBus::new();
        let listing = cache(&remote, &bus);
        listing.pages().await.unwrap();
        listing.folders().await.unwrap();

        let folder = remote.create_folder(OWNER, "Work", "").await.unwrap();
        bus.publish(Invalidation::FolderCreated(folder.id));

        assert!(!listing.is_pages_stale().await);
        assert!(listing.is_folders_stale().await);
        assert_eq!(listing.folders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lagging_receiver_drops_everything() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let bus = InvalidationBus::with_capacity(1);
        let listing = cache(&remote, &bus);
        listing.pages().await.unwrap();
        listing.folders().await.unwrap();

        for _ in 0..3 {
            bus.publish(Invalidation::PageMetadata(PageId::new()));
        }
        assert!(listing.is_folders_stale().await);
        assert!(listing.is_pages_stale().await);
    }

    #[tokio::test]
    async fn counts_include_empty_folders() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let bus = InvalidationBus::new();
        let work = remote.create_folder(OWNER, "Work", "").await.unwrap();
        let empty = remote.create_folder(OWNER, "Empty", "").await.unwrap();
        for _ in 0..2 {
            remote
                .create_page(OWNER, NewPage {
                    folder_id: Some(work.id),
                    ..NewPage::default()
                })
                .await
                .unwrap();
        }
        remote.create_page(OWNER, NewPage::default()).await.unwrap();

        let listing = cache(&remote, &bus);
        let counts = listing.folder_page_counts().await.unwrap();
        assert_eq!(counts.get(&work.id), Some(&2));
        assert_eq!(counts.get(&empty.id), Some(&0));
        assert_eq!(listing.pages_in_folder(None).await.unwrap().len(), 1);
    }
}
