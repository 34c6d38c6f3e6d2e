//! Page lifecycle outside of the editor: create, delete, list.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::diagram::DiagramConverter;
use crate::drafts::DraftStore;
use crate::invalidation::{Invalidation, InvalidationBus};
use crate::listing::ListingCache;
use crate::models::{display_page_name, FolderId, PageContent, PageId, PageRecord, PageSummary};
use crate::remote::{NewPage, RemoteStore};
use crate::session::Reconciler;
use crate::{Error, Result};

/// Which pages a listing should include
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderFilter {
    #[default]
    All,
    Unfiled,
    Folder(FolderId),
}

impl FolderFilter {
    fn matches(self, page: &PageSummary) -> bool {
        match self {
            Self::All => true,
            Self::Unfiled => page.folder_id.is_none(),
            Self::Folder(folder_id) => page.folder_id == Some(folder_id),
        }
    }
}

/// Page operations for one owner
pub struct PageService {
    owner_id: String,
    remote: Arc<dyn RemoteStore>,
    drafts: Arc<dyn DraftStore>,
    bus: InvalidationBus,
    listing: ListingCache,
}

impl PageService {
    #[must_use]
    pub fn new(owner_id: impl Into<String>, reconciler: &Reconciler) -> Self {
        let owner_id = owner_id.into();
        let listing = ListingCache::new(
            owner_id.clone(),
            Arc::clone(reconciler.remote()),
            reconciler.bus(),
        );
        Self {
            owner_id,
            remote: Arc::clone(reconciler.remote()),
            drafts: Arc::clone(reconciler.drafts()),
            bus: reconciler.bus().clone(),
            listing,
        }
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Listing cache backing [`Self::list_pages`]
    #[must_use]
    pub const fn listing(&self) -> &ListingCache {
        &self.listing
    }

    /// Create a page; a blank name becomes "Untitled"
    pub async fn create_page(
        &self,
        name: &str,
        folder_id: Option<FolderId>,
        content: PageContent,
    ) -> Result<PageRecord> {
        let record = self
            .remote
            .create_page(
                &self.owner_id,
                NewPage {
                    name: display_page_name(name),
                    folder_id,
                    content,
                },
            )
            .await?;
        tracing::info!("Created page {} ({})", record.id, record.name);
        self.bus.publish(Invalidation::PageCreated(record.id));
        Ok(record)
    }

    /// Create a page whose content is converted from diagram source
    pub async fn create_from_diagram(
        &self,
        converter: &dyn DiagramConverter,
        source: &str,
        name: &str,
        folder_id: Option<FolderId>,
    ) -> Result<PageRecord> {
        if source.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Diagram source cannot be empty".to_string(),
            ));
        }
        let elements = converter
            .convert(source)
            .map_err(|error| Error::Diagram(error.to_string()))?;
        tracing::debug!("Converted diagram into {} elements", elements.len());
        self.create_page(name, folder_id, PageContent::new(elements))
            .await
    }

    /// Delete the remote page, then its local draft
    pub async fn delete_page(&self, page_id: &PageId) -> Result<()> {
        self.remote.delete_page(page_id).await?;
        if self.drafts.delete(page_id)? {
            tracing::debug!("Dropped local draft of deleted page {page_id}");
        }
        tracing::info!("Deleted page {page_id}");
        self.bus.publish(Invalidation::PageRemoved(*page_id));
        Ok(())
    }

    /// Page summaries matching `filter`, most recently updated first
    pub async fn list_pages(&self, filter: FolderFilter) -> Result<Vec<PageSummary>> {
        Ok(self
            .listing
            .pages()
            .await?
            .into_iter()
            .filter(|page| filter.matches(page))
            .collect())
    }

    /// Number of pages in each folder
    pub async fn folder_page_counts(&self) -> Result<BTreeMap<FolderId, usize>> {
        self.listing.folder_page_counts().await
    }
}
