//! Persisted local cache shared across editors and list views.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::{
    Database, DraftRepository, FolderCacheRepository, SqliteDraftRepository,
    SqliteFolderCacheRepository,
};
use crate::drafts::DraftStore;
use crate::models::{CachedFolder, FolderId, LocalDraft, PageId};
use crate::{Error, Result};

/// Thread-safe `SQLite`-backed store for drafts and cached folder metadata.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open the store at the given filesystem path.
    ///
    /// A file that is not a valid database is moved aside and a fresh cache
    /// is created in its place.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = match Database::open(&db_path) {
            Ok(db) => db,
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::warn!(
                    "Local cache at {} is unreadable: {}. Moving it aside and starting fresh.",
                    db_path.display(),
                    error
                );
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path)?
            }
            Err(error) => return Err(error),
        };

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem location of the cache, if persisted.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| Error::Database("local store lock poisoned".to_string()))
    }

    fn is_corrupted_db_error(error: &Error) -> bool {
        let message = error.to_string().to_ascii_lowercase();
        message.contains("file is not a database") || message.contains("malformed")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let base_name = db_path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("drawbook.db");
            let backup_path = db_path.with_file_name(format!("{base_name}.corrupt-{timestamp}"));

            std::fs::rename(db_path, &backup_path)?;
            tracing::warn!(
                "Moved corrupted local cache from {} to {}",
                db_path.display(),
                backup_path.display()
            );
        }

        let Some(parent) = db_path.parent() else {
            return Ok(());
        };
        let Some(base_name) = db_path.file_name().and_then(|name| name.to_str()) else {
            return Ok(());
        };
        let sidecar_prefix = format!("{base_name}-");

        for entry in std::fs::read_dir(parent)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name.starts_with(&sidecar_prefix) {
                let path = entry.path();
                std::fs::remove_file(&path)?;
                tracing::warn!("Removed stale cache sidecar {}", path.display());
            }
        }

        Ok(())
    }

    /// Record folder metadata if it is newer than what is cached.
    pub fn cache_folder(&self, folder: &CachedFolder) -> Result<bool> {
        let db = self.lock()?;
        SqliteFolderCacheRepository::new(db.connection()).put_if_newer(folder)
    }

    /// Cached folder metadata by id.
    pub fn cached_folder(&self, folder_id: &FolderId) -> Result<Option<CachedFolder>> {
        let db = self.lock()?;
        SqliteFolderCacheRepository::new(db.connection()).get(folder_id)
    }

    /// Cached folders for an owner.
    pub fn cached_folders(&self, owner_id: &str) -> Result<Vec<CachedFolder>> {
        let db = self.lock()?;
        SqliteFolderCacheRepository::new(db.connection()).list_for_owner(owner_id)
    }

    /// Forget one cached folder.
    pub fn remove_cached_folder(&self, folder_id: &FolderId) -> Result<()> {
        let db = self.lock()?;
        SqliteFolderCacheRepository::new(db.connection()).remove(folder_id)
    }

    /// Forget every cached folder of an owner (e.g. on sign-out).
    pub fn clear_owner_folders(&self, owner_id: &str) -> Result<usize> {
        let db = self.lock()?;
        SqliteFolderCacheRepository::new(db.connection()).clear_owner(owner_id)
    }
}

impl DraftStore for LocalStore {
    fn get(&self, page_id: &PageId) -> Result<Option<Arc<LocalDraft>>> {
        let db = self.lock()?;
        Ok(SqliteDraftRepository::new(db.connection())
            .get(page_id)?
            .map(Arc::new))
    }

    fn set(&self, draft: LocalDraft) -> Result<Arc<LocalDraft>> {
        let db = self.lock()?;
        SqliteDraftRepository::new(db.connection()).upsert(&draft)?;
        Ok(Arc::new(draft))
    }

    fn delete(&self, page_id: &PageId) -> Result<bool> {
        let db = self.lock()?;
        SqliteDraftRepository::new(db.connection()).delete(page_id)
    }

    fn list(&self) -> Result<Vec<Arc<LocalDraft>>> {
        let db = self.lock()?;
        Ok(SqliteDraftRepository::new(db.connection())
            .list()?
            .into_iter()
            .map(Arc::new)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageContent;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn drafts_survive_reopen() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("drawbook.db");
        let page_id = PageId::new();

        {
            let store = LocalStore::open_path(&db_path).unwrap();
            store
                .set(LocalDraft::new(
                    page_id,
                    "Architecture",
                    PageContent::new(vec![json!({"id": "box", "type": "rectangle"})]),
                    1_700_000_000_000,
                ))
                .unwrap();
        }

        let store = LocalStore::open_path(&db_path).unwrap();
        let draft = store.get(&page_id).unwrap().unwrap();
        assert_eq!(draft.name, "Architecture");
        assert_eq!(draft.content.len(), 1);
        assert_eq!(draft.updated_at, 1_700_000_000_000);
    }

    #[test]
    fn corrupted_file_is_quarantined_and_replaced() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("drawbook.db");
        let wal_path = tmp.path().join("drawbook.db-wal");
        std::fs::write(
            &db_path,
            b"definitely not sqlite, just enough bytes to fail the header check",
        )
        .unwrap();
        std::fs::write(&wal_path, b"wal").unwrap();

        let store = LocalStore::open_path(&db_path).unwrap();
        assert!(store.list().unwrap().is_empty());

        let backups = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("drawbook.db.corrupt-")
            })
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn detects_corruption_messages() {
        assert!(LocalStore::is_corrupted_db_error(&Error::Database(
            "file is not a database".to_string()
        )));
        assert!(!LocalStore::is_corrupted_db_error(&Error::InvalidInput(
            "name cannot be empty".to_string()
        )));
    }

    #[test]
    fn folder_cache_roundtrip() {
        let store = LocalStore::open_in_memory().unwrap();
        let folder_id = FolderId::new();
        let cached = CachedFolder {
            folder_id,
            name: "Work".to_string(),
            owner_id: "user-1".to_string(),
            created_at: 1,
            updated_at: 2,
        };

        assert!(store.cache_folder(&cached).unwrap());
        assert_eq!(store.cached_folder(&folder_id).unwrap(), Some(cached));
        assert_eq!(store.cached_folders("user-1").unwrap().len(), 1);
        assert_eq!(store.clear_owner_folders("user-1").unwrap(), 1);
    }
}
