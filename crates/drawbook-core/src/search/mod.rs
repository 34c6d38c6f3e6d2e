//! Name search across an owner's folders and pages.
//!
//! Matching is a case-insensitive substring test on display names, run over
//! the cached listings rather than the remote.

use crate::listing::ListingCache;
use crate::models::{display_page_name, Folder, PageSummary};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    pub folders: Vec<Folder>,
    pub pages: Vec<PageSummary>,
}

impl SearchResults {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.pages.is_empty()
    }
}

/// Search folder and page names
pub async fn search(listing: &ListingCache, query: &str) -> Result<SearchResults> {
    let needle = normalize_query(query)?;
    let folders = listing.folders().await?;
    let pages = listing.pages().await?;
    Ok(filter_by_name(&needle, folders, pages))
}

fn normalize_query(query: &str) -> Result<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Search query cannot be empty".to_string()));
    }
    Ok(trimmed.to_lowercase())
}

fn filter_by_name(needle: &str, folders: Vec<Folder>, pages: Vec<PageSummary>) -> SearchResults {
    SearchResults {
        folders: folders
            .into_iter()
            .filter(|folder| folder.name.to_lowercase().contains(needle))
            .collect(),
        pages: pages
            .into_iter()
            .filter(|page| display_page_name(&page.name).to_lowercase().contains(needle))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invalidation::InvalidationBus;
    use crate::models::PageContent;
    use crate::remote::{MemoryRemoteStore, NewPage, RemoteStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn matches_case_insensitively_across_folders_and_pages() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.create_folder("me", "Design Reviews", "").await.unwrap();
        remote.create_folder("me", "Groceries", "").await.unwrap();
        remote
            .create_page("me", NewPage {
                name: "API design".to_string(),
                content: PageContent::empty(),
                ..NewPage::default()
            })
            .await
            .unwrap();
        remote
            .create_page("me", NewPage {
                name: String::new(),
                ..NewPage::default()
            })
            .await
            .unwrap();

        let listing = ListingCache::new("me", remote.clone(), &InvalidationBus::new());
        let results = search(&listing, "  DESIGN ").await.unwrap();
        assert_eq!(results.folders.len(), 1);
        assert_eq!(results.pages.len(), 1);
        assert_eq!(results.pages[0].name, "API design");

        // Blank names match as "Untitled".
        assert_eq!(search(&listing, "untitled").await.unwrap().pages.len(), 1);
        assert!(search(&listing, "zebra").await.unwrap().is_empty());
    }

    #[test]
    fn empty_query_is_rejected() {
        assert!(matches!(normalize_query(" \t"), Err(Error::InvalidInput(_))));
    }
}
