//! Folder CRUD with a last-write-wins local metadata cache.

use std::sync::Arc;

use crate::invalidation::{Invalidation, InvalidationBus};
use crate::models::{normalize_folder_name, CachedFolder, Folder, FolderId};
use crate::remote::RemoteStore;
use crate::services::LocalStore;
use crate::Result;

/// Folder operations for one owner
pub struct FolderService {
    owner_id: String,
    remote: Arc<dyn RemoteStore>,
    bus: InvalidationBus,
    cache: Option<LocalStore>,
}

impl FolderService {
    #[must_use]
    pub fn new(
        owner_id: impl Into<String>,
        remote: Arc<dyn RemoteStore>,
        bus: InvalidationBus,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            remote,
            bus,
            cache: None,
        }
    }

    /// Keep folder metadata in the local store
    #[must_use]
    pub fn with_cache(mut self, store: LocalStore) -> Self {
        self.cache = Some(store);
        self
    }

    pub async fn create(&self, name: &str, icon: &str) -> Result<Folder> {
        let name = normalize_folder_name(name)?;
        let folder = self
            .remote
            .create_folder(&self.owner_id, &name, icon.trim())
            .await?;
        tracing::info!("Created folder {} ({})", folder.id, folder.name);
        self.remember(&folder)?;
        self.bus.publish(Invalidation::FolderCreated(folder.id));
        Ok(folder)
    }

    /// Rename a folder; returns `None` when the trimmed name is unchanged
    pub async fn rename(&self, folder: &Folder, new_name: &str) -> Result<Option<Folder>> {
        let new_name = normalize_folder_name(new_name)?;
        if new_name == folder.name {
            return Ok(None);
        }
        let renamed = self.remote.rename_folder(&folder.id, &new_name).await?;
        tracing::info!("Renamed folder {} to {}", renamed.id, renamed.name);
        self.remember(&renamed)?;
        self.bus.publish(Invalidation::FolderMetadata(renamed.id));
        Ok(Some(renamed))
    }

    pub async fn set_icon(&self, folder_id: &FolderId, icon: &str) -> Result<Folder> {
        let folder = self.remote.set_folder_icon(folder_id, icon.trim()).await?;
        self.remember(&folder)?;
        self.bus.publish(Invalidation::FolderMetadata(folder.id));
        Ok(folder)
    }

    /// Delete a folder; its pages become unfiled
    pub async fn delete(&self, folder_id: &FolderId) -> Result<()> {
        self.remote.delete_folder(folder_id).await?;
        if let Some(cache) = &self.cache {
            cache.remove_cached_folder(folder_id)?;
        }
        tracing::info!("Deleted folder {folder_id}");
        self.bus.publish(Invalidation::FolderRemoved(*folder_id));
        Ok(())
    }

    /// Fetch folders from the remote and refresh the local cache
    pub async fn list(&self) -> Result<Vec<Folder>> {
        let folders = self.remote.list_folders(&self.owner_id).await?;
        for folder in &folders {
            self.remember(folder)?;
        }
        Ok(folders)
    }

    /// Folder metadata known locally, without touching the remote
    pub fn cached(&self) -> Result<Vec<CachedFolder>> {
        match &self.cache {
            Some(cache) => cache.cached_folders(&self.owner_id),
            None => Ok(Vec::new()),
        }
    }

    fn remember(&self, folder: &Folder) -> Result<()> {
        if let Some(cache) = &self.cache {
            let accepted = cache.cache_folder(&CachedFolder::from_folder(folder, &self.owner_id))?;
            if !accepted {
                tracing::debug!("Kept newer cached metadata for folder {}", folder.id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryRemoteStore;
    use crate::test_support::ManualClock;
    use crate::Error;

    const OWNER: &str = "owner";

    fn service(remote: Arc<MemoryRemoteStore>, bus: &InvalidationBus) -> FolderService {
        FolderService::new(OWNER, remote, bus.clone())
            .with_cache(LocalStore::open_in_memory().unwrap())
    }

    #[tokio::test]
    async fn create_trims_and_rejects_blank_names() {
        let bus = InvalidationBus::new();
        let mut signals = bus.subscribe();
        let folders = service(Arc::new(MemoryRemoteStore::new()), &bus);

        assert!(matches!(
            folders.create("   ", "").await,
            Err(Error::InvalidInput(_))
        ));

        let folder = folders.create("  Work ", "💼").await.unwrap();
        assert_eq!(folder.name, "Work");
        assert_eq!(signals.try_recv().unwrap(), Invalidation::FolderCreated(folder.id));
        assert_eq!(folders.cached().unwrap()[0].name, "Work");
    }

    #[tokio::test]
    async fn rename_to_same_name_is_a_no_op() {
        let bus = InvalidationBus::new();
        let clock = Arc::new(ManualClock::new(1_000));
        let folders = service(Arc::new(MemoryRemoteStore::with_clock(clock.clone())), &bus);
        let folder = folders.create("Work", "").await.unwrap();
        let mut signals = bus.subscribe();

        assert_eq!(folders.rename(&folder, " Work ").await.unwrap(), None);
        assert!(signals.try_recv().is_err());

        clock.advance(10);
        let renamed = folders.rename(&folder, "Projects").await.unwrap().unwrap();
        assert_eq!(renamed.name, "Projects");
        assert_eq!(signals.try_recv().unwrap(), Invalidation::FolderMetadata(folder.id));
        assert_eq!(folders.cached().unwrap()[0].name, "Projects");
    }

    #[tokio::test]
    async fn stale_listing_does_not_overwrite_newer_cache() {
        let bus = InvalidationBus::new();
        let clock = Arc::new(ManualClock::new(1_000));
        let remote = Arc::new(MemoryRemoteStore::with_clock(clock.clone()));
        let folders = service(remote, &bus);
        let folder = folders.create("Work", "").await.unwrap();

        let cache = folders.cache.as_ref().unwrap();
        let newer = CachedFolder {
            name: "Renamed elsewhere".to_string(),
            updated_at: folder.updated_at + 500,
            ..CachedFolder::from_folder(&folder, OWNER)
        };
        assert!(cache.cache_folder(&newer).unwrap());

        folders.list().await.unwrap();
        assert_eq!(folders.cached().unwrap()[0].name, "Renamed elsewhere");
    }

    #[tokio::test]
    async fn delete_forgets_cached_metadata() {
        let bus = InvalidationBus::new();
        let folders = service(Arc::new(MemoryRemoteStore::new()), &bus);
        let folder = folders.create("Work", "").await.unwrap();
        folders.set_icon(&folder.id, " 🎨 ").await.unwrap();
        assert_eq!(folders.list().await.unwrap()[0].icon, "🎨");

        folders.delete(&folder.id).await.unwrap();
        assert!(folders.cached().unwrap().is_empty());
        assert!(folders.list().await.unwrap().is_empty());
    }
}
