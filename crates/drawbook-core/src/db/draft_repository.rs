//! Draft repository implementation

use crate::error::{Error, Result};
use crate::models::{LocalDraft, PageContent, PageId};
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for draft storage operations
pub trait DraftRepository {
    /// Get the draft for a page
    fn get(&self, page_id: &PageId) -> Result<Option<LocalDraft>>;

    /// Insert or replace the draft for a page
    fn upsert(&self, draft: &LocalDraft) -> Result<()>;

    /// Remove the draft for a page; returns whether one existed
    fn delete(&self, page_id: &PageId) -> Result<bool>;

    /// List drafts, most recently captured first
    fn list(&self) -> Result<Vec<LocalDraft>>;
}

/// `SQLite` implementation of `DraftRepository`
pub struct SqliteDraftRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDraftRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a draft from a database row
    fn parse_draft(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, i64)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }

    fn into_draft(raw: (String, String, String, i64)) -> Result<LocalDraft> {
        let (page_id, name, content, updated_at) = raw;
        let page_id = page_id
            .parse::<PageId>()
            .map_err(|_| Error::Database(format!("Invalid page id in draft cache: {page_id}")))?;
        Ok(LocalDraft {
            page_id,
            name,
            content: PageContent::from_json_str(&content)?,
            updated_at,
        })
    }
}

impl DraftRepository for SqliteDraftRepository<'_> {
    fn get(&self, page_id: &PageId) -> Result<Option<LocalDraft>> {
        let raw = self
            .conn
            .query_row(
                "SELECT page_id, name, content, updated_at FROM drafts WHERE page_id = ?",
                params![page_id.as_str()],
                Self::parse_draft,
            )
            .optional()?;

        raw.map(Self::into_draft).transpose()
    }

    fn upsert(&self, draft: &LocalDraft) -> Result<()> {
        let content = draft.content.to_json_string()?;
        self.conn.execute(
            "INSERT OR REPLACE INTO drafts (page_id, name, content, updated_at)
             VALUES (?, ?, ?, ?)",
            params![draft.page_id.as_str(), draft.name, content, draft.updated_at],
        )?;
        Ok(())
    }

    fn delete(&self, page_id: &PageId) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM drafts WHERE page_id = ?",
            params![page_id.as_str()],
        )?;
        Ok(rows > 0)
    }

    fn list(&self) -> Result<Vec<LocalDraft>> {
        let mut stmt = self.conn.prepare(
            "SELECT page_id, name, content, updated_at
             FROM drafts
             ORDER BY updated_at DESC",
        )?;

        let rows = stmt
            .query_map([], Self::parse_draft)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(Self::into_draft).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn draft(name: &str, updated_at: i64) -> LocalDraft {
        LocalDraft::new(
            PageId::new(),
            name,
            PageContent::new(vec![json!({"id": name, "type": "rectangle"})]),
            updated_at,
        )
    }

    #[test]
    fn test_upsert_and_get() {
        let db = setup();
        let repo = SqliteDraftRepository::new(db.connection());

        let saved = draft("Flowchart", 100);
        repo.upsert(&saved).unwrap();

        let fetched = repo.get(&saved.page_id).unwrap().unwrap();
        assert_eq!(fetched, saved);
    }

    #[test]
    fn test_upsert_replaces_whole_entry() {
        let db = setup();
        let repo = SqliteDraftRepository::new(db.connection());

        let mut saved = draft("First", 100);
        repo.upsert(&saved).unwrap();

        saved.name = "Second".to_string();
        saved.content = PageContent::empty();
        saved.updated_at = 200;
        repo.upsert(&saved).unwrap();

        let fetched = repo.get(&saved.page_id).unwrap().unwrap();
        assert_eq!(fetched.name, "Second");
        assert!(fetched.content.is_empty());
        assert_eq!(fetched.updated_at, 200);
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let db = setup();
        let repo = SqliteDraftRepository::new(db.connection());
        assert!(repo.get(&PageId::new()).unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let db = setup();
        let repo = SqliteDraftRepository::new(db.connection());

        let saved = draft("Doomed", 100);
        repo.upsert(&saved).unwrap();

        assert!(repo.delete(&saved.page_id).unwrap());
        assert!(!repo.delete(&saved.page_id).unwrap());
        assert!(repo.get(&saved.page_id).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let db = setup();
        let repo = SqliteDraftRepository::new(db.connection());

        repo.upsert(&draft("old", 100)).unwrap();
        repo.upsert(&draft("new", 300)).unwrap();
        repo.upsert(&draft("mid", 200)).unwrap();

        let names = repo
            .list()
            .unwrap()
            .into_iter()
            .map(|draft| draft.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["new", "mid", "old"]);
    }
}
