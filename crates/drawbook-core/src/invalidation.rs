//! Broadcast of "listing data changed" signals.
//!
//! Publishers are the page session and the page/folder services; the
//! subscriber is whatever caches listings (see [`crate::listing`]).

use tokio::sync::broadcast;

use crate::models::{FolderId, PageId};

const DEFAULT_CAPACITY: usize = 64;

/// A piece of listing data that is no longer current
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Invalidation {
    PageCreated(PageId),
    PageMetadata(PageId),
    PageRemoved(PageId),
    FolderCreated(FolderId),
    FolderMetadata(FolderId),
    FolderRemoved(FolderId),
}

impl Invalidation {
    /// Whether page listings must be refetched
    #[must_use]
    pub const fn affects_pages(self) -> bool {
        // Removing a folder unfiles its pages, so page listings change too.
        matches!(
            self,
            Self::PageCreated(_)
                | Self::PageMetadata(_)
                | Self::PageRemoved(_)
                | Self::FolderRemoved(_)
        )
    }

    /// Whether folder listings must be refetched
    #[must_use]
    pub const fn affects_folders(self) -> bool {
        matches!(
            self,
            Self::FolderCreated(_) | Self::FolderMetadata(_) | Self::FolderRemoved(_)
        )
    }
}

/// Cloneable handle onto one broadcast channel
#[derive(Debug, Clone)]
pub struct InvalidationBus {
    sender: broadcast::Sender<Invalidation>,
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InvalidationBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a signal; dropped silently when nobody listens
    pub fn publish(&self, invalidation: Invalidation) {
        let receivers = self.sender.send(invalidation).unwrap_or(0);
        tracing::trace!(?invalidation, receivers, "Published invalidation");
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = InvalidationBus::new();
        bus.publish(Invalidation::PageMetadata(PageId::new()));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn every_subscriber_sees_each_signal() {
        let bus = InvalidationBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.clone().subscribe();
        let page_id = PageId::new();

        bus.publish(Invalidation::PageMetadata(page_id));

        assert_eq!(first.recv().await.unwrap(), Invalidation::PageMetadata(page_id));
        assert_eq!(second.recv().await.unwrap(), Invalidation::PageMetadata(page_id));
    }

    #[test]
    fn folder_removal_touches_both_listings() {
        let removed = Invalidation::FolderRemoved(FolderId::new());
        assert!(removed.affects_pages());
        assert!(removed.affects_folders());

        let renamed = Invalidation::FolderMetadata(FolderId::new());
        assert!(!renamed.affects_pages());
        assert!(Invalidation::PageCreated(PageId::new()).affects_pages());
    }
}
