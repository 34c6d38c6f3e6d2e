//! Local draft model

use serde::{Deserialize, Serialize};

use super::{PageContent, PageId, PageRecord};

/// Locally cached, not-yet-confirmed copy of a page.
///
/// `updated_at` is the local wall-clock capture time, stamped before the
/// remote write is attempted. It is never the server commit time, except
/// when a manual refresh copies the remote record into the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDraft {
    pub page_id: PageId,
    pub name: String,
    pub content: PageContent,
    /// Capture timestamp (Unix ms)
    pub updated_at: i64,
}

impl LocalDraft {
    #[must_use]
    pub fn new(
        page_id: PageId,
        name: impl Into<String>,
        content: PageContent,
        updated_at: i64,
    ) -> Self {
        Self {
            page_id,
            name: name.into(),
            content,
            updated_at,
        }
    }

    /// Mirror a remote record into a draft, keeping the remote timestamp
    #[must_use]
    pub fn from_record(record: &PageRecord) -> Self {
        Self {
            page_id: record.id,
            name: record.name.clone(),
            content: record.content.clone(),
            updated_at: record.updated_at,
        }
    }
}
