//! Doubles shared by the crate's unit tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use crate::models::{Folder, FolderId, PageContent, PageId, PageRecord, PageSummary};
use crate::remote::{MemoryRemoteStore, NewPage, RemoteError, RemoteResult, RemoteStore};
use crate::util::Clock;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self(AtomicI64::new(start_ms))
    }

    pub fn set(&self, now_ms: i64) {
        self.0.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.0.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Remote whose page writes (or reads) block until released one by one
pub struct GatedRemote {
    inner: Arc<MemoryRemoteStore>,
    gate_reads: bool,
    entered: Notify,
    settled: Notify,
    release: Semaphore,
}

impl GatedRemote {
    /// Gate `set_page`
    pub fn new(inner: Arc<MemoryRemoteStore>) -> Self {
        Self {
            inner,
            gate_reads: false,
            entered: Notify::new(),
            settled: Notify::new(),
            release: Semaphore::new(0),
        }
    }

    /// Gate `get_page` after the record has been read, leaving writes free
    pub fn reads(inner: Arc<MemoryRemoteStore>) -> Self {
        Self {
            gate_reads: true,
            ..Self::new(inner)
        }
    }

    /// Wait until a call is parked at the gate
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Wait until a released write has reached the inner store
    pub async fn wait_settled(&self) {
        self.settled.notified().await;
    }

    /// Let one parked call through
    pub fn release_one(&self) {
        self.release.add_permits(1);
    }

    async fn pass_gate(&self) -> RemoteResult<()> {
        self.entered.notify_one();
        self.release
            .acquire()
            .await
            .map_err(|_| RemoteError::Api("gate closed".to_string()))?
            .forget();
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for GatedRemote {
    async fn get_page(&self, id: &PageId) -> RemoteResult<PageRecord> {
        let record = self.inner.get_page(id).await?;
        if self.gate_reads {
            self.pass_gate().await?;
        }
        Ok(record)
    }

    async fn set_page(&self, id: &PageId, content: &PageContent, name: &str) -> RemoteResult<i64> {
        if !self.gate_reads {
            self.pass_gate().await?;
        }
        let result = self.inner.set_page(id, content, name).await;
        self.settled.notify_one();
        result
    }

    async fn create_page(&self, owner_id: &str, page: NewPage) -> RemoteResult<PageRecord> {
        self.inner.create_page(owner_id, page).await
    }

    async fn delete_page(&self, id: &PageId) -> RemoteResult<()> {
        self.inner.delete_page(id).await
    }

    async fn list_pages(&self, owner_id: &str) -> RemoteResult<Vec<PageSummary>> {
        self.inner.list_pages(owner_id).await
    }

    async fn list_folders(&self, owner_id: &str) -> RemoteResult<Vec<Folder>> {
        self.inner.list_folders(owner_id).await
    }

    async fn create_folder(&self, owner_id: &str, name: &str, icon: &str) -> RemoteResult<Folder> {
        self.inner.create_folder(owner_id, name, icon).await
    }

    async fn rename_folder(&self, id: &FolderId, name: &str) -> RemoteResult<Folder> {
        self.inner.rename_folder(id, name).await
    }

    async fn set_folder_icon(&self, id: &FolderId, icon: &str) -> RemoteResult<Folder> {
        self.inner.set_folder_icon(id, icon).await
    }

    async fn delete_folder(&self, id: &FolderId) -> RemoteResult<()> {
        self.inner.delete_folder(id).await
    }
}
