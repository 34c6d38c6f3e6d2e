//! Folder metadata cache repository

use crate::error::{Error, Result};
use crate::models::{CachedFolder, FolderId};
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for cached folder metadata
pub trait FolderCacheRepository {
    /// Store the entry if none exists or it is strictly newer than the cached one.
    ///
    /// Returns whether the cache changed. `created_at` of an existing entry is kept.
    fn put_if_newer(&self, folder: &CachedFolder) -> Result<bool>;

    /// Get a cached folder
    fn get(&self, folder_id: &FolderId) -> Result<Option<CachedFolder>>;

    /// Remove a cached folder
    fn remove(&self, folder_id: &FolderId) -> Result<()>;

    /// List cached folders for an owner, by name
    fn list_for_owner(&self, owner_id: &str) -> Result<Vec<CachedFolder>>;

    /// Drop every cached folder belonging to an owner
    fn clear_owner(&self, owner_id: &str) -> Result<usize>;
}

/// `SQLite` implementation of `FolderCacheRepository`
pub struct SqliteFolderCacheRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteFolderCacheRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, i64, i64)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
    }

    fn into_cached(raw: (String, String, String, i64, i64)) -> Result<CachedFolder> {
        let (folder_id, name, owner_id, created_at, updated_at) = raw;
        let folder_id = folder_id
            .parse::<FolderId>()
            .map_err(|_| Error::Database(format!("Invalid folder id in cache: {folder_id}")))?;
        Ok(CachedFolder {
            folder_id,
            name,
            owner_id,
            created_at,
            updated_at,
        })
    }
}

impl FolderCacheRepository for SqliteFolderCacheRepository<'_> {
    fn put_if_newer(&self, folder: &CachedFolder) -> Result<bool> {
        let rows = self.conn.execute(
            "INSERT INTO folder_cache (folder_id, name, owner_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(folder_id) DO UPDATE SET
                name = excluded.name,
                owner_id = excluded.owner_id,
                updated_at = excluded.updated_at
             WHERE excluded.updated_at > folder_cache.updated_at",
            params![
                folder.folder_id.as_str(),
                folder.name,
                folder.owner_id,
                folder.created_at,
                folder.updated_at
            ],
        )?;
        Ok(rows > 0)
    }

    fn get(&self, folder_id: &FolderId) -> Result<Option<CachedFolder>> {
        let raw = self
            .conn
            .query_row(
                "SELECT folder_id, name, owner_id, created_at, updated_at
                 FROM folder_cache WHERE folder_id = ?",
                params![folder_id.as_str()],
                Self::parse_row,
            )
            .optional()?;

        raw.map(Self::into_cached).transpose()
    }

    fn remove(&self, folder_id: &FolderId) -> Result<()> {
        self.conn.execute(
            "DELETE FROM folder_cache WHERE folder_id = ?",
            params![folder_id.as_str()],
        )?;
        Ok(())
    }

    fn list_for_owner(&self, owner_id: &str) -> Result<Vec<CachedFolder>> {
        let mut stmt = self.conn.prepare(
            "SELECT folder_id, name, owner_id, created_at, updated_at
             FROM folder_cache
             WHERE owner_id = ?
             ORDER BY name COLLATE NOCASE ASC",
        )?;

        let rows = stmt
            .query_map(params![owner_id], Self::parse_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(Self::into_cached).collect()
    }

    fn clear_owner(&self, owner_id: &str) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM folder_cache WHERE owner_id = ?",
            params![owner_id],
        )?;
        Ok(rows)
    }
}
