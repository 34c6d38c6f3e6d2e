//! Per-page reconciliation between the editor, the draft cache and the remote.
//!
//! A [`PageSession`] lives while an editor has the page mounted. It owns the
//! capture baseline and the save state machine; the draft cache and remote
//! store are shared with every other session through [`Reconciler`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::drafts::DraftStore;
use crate::invalidation::{Invalidation, InvalidationBus};
use crate::models::{LocalDraft, PageContent, PageId, PageRecord};
use crate::reconcile::{choose_source, draft_is_newer, Source};
use crate::remote::{RemoteError, RemoteStore};
use crate::state::SaveState;
use crate::util::{Clock, SystemClock};
use crate::{Error, Result};

/// Shared dependencies from which page sessions are opened
#[derive(Clone)]
pub struct Reconciler {
    remote: Arc<dyn RemoteStore>,
    drafts: Arc<dyn DraftStore>,
    bus: InvalidationBus,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        drafts: Arc<dyn DraftStore>,
        bus: InvalidationBus,
    ) -> Self {
        Self {
            remote,
            drafts,
            bus,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to stamp drafts
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Mount a page
    #[must_use]
    pub fn open(&self, page_id: PageId) -> PageSession {
        PageSession {
            page_id,
            remote: Arc::clone(&self.remote),
            drafts: Arc::clone(&self.drafts),
            bus: self.bus.clone(),
            clock: Arc::clone(&self.clock),
            state: Arc::new(Mutex::new(SessionState::default())),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    #[must_use]
    pub fn drafts(&self) -> &Arc<dyn DraftStore> {
        &self.drafts
    }

    #[must_use]
    pub fn bus(&self) -> &InvalidationBus {
        &self.bus
    }
}

/// Content chosen to render when a page is mounted or refreshed
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPage {
    pub page_id: PageId,
    pub content: PageContent,
    pub name: String,
    pub source: Source,
    pub remote_updated_at: i64,
    /// Timestamp of the cached draft at load time, if any
    pub local_updated_at: Option<i64>,
}

impl LoadedPage {
    fn from_remote(record: PageRecord, local_updated_at: Option<i64>) -> Self {
        Self {
            page_id: record.id,
            content: record.content,
            name: record.name,
            source: Source::Remote,
            remote_updated_at: record.updated_at,
            local_updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Nothing changed since the last capture; no writes happened
    Unchanged,
    /// A capture was already in flight; this one was dropped
    Skipped,
    /// Draft cached and remote write acknowledged
    Saved {
        local_updated_at: i64,
        remote_updated_at: i64,
    },
    /// The session was unmounted; the outcome was ignored
    Detached,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Refreshed(LoadedPage),
    /// A newer local draft would be discarded; caller must confirm
    ConfirmationRequired {
        local_updated_at: i64,
        remote_updated_at: i64,
    },
    /// A capture is in flight; try again once it settles
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    content: PageContent,
    name: String,
}

impl Snapshot {
    fn matches(&self, content: &PageContent, name: &str) -> bool {
        self.name == name && &self.content == content
    }
}

/// Returns the session to `Idle` when a refresh ends, including when its
/// future is dropped mid-fetch.
struct RefreshGuard<'a>(&'a Mutex<SessionState>);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.lock() {
            if state.save_state == SaveState::Refreshing {
                state.save_state = SaveState::Idle;
            }
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    save_state: SaveState,
    baseline: Option<Snapshot>,
    last_remote_updated_at: Option<i64>,
}

/// One mounted page editor.
///
/// Cloning yields another handle onto the same session, which is how the
/// autosave task shares it with the presentation layer.
#[derive(Clone)]
pub struct PageSession {
    page_id: PageId,
    remote: Arc<dyn RemoteStore>,
    drafts: Arc<dyn DraftStore>,
    bus: InvalidationBus,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<SessionState>>,
    mounted: Arc<AtomicBool>,
}

impl PageSession {
    #[must_use]
    pub const fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Current position in the save state machine
    pub fn save_state(&self) -> Result<SaveState> {
        Ok(self.lock()?.save_state)
    }

    /// Remote `updated_at` last observed by this session
    pub fn last_remote_updated_at(&self) -> Result<Option<i64>> {
        Ok(self.lock()?.last_remote_updated_at)
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Detach the editor. In-flight remote writes still complete, but their
    /// outcome is no longer reported.
    pub fn unmount(&self) {
        if self.mounted.swap(false, Ordering::SeqCst) {
            tracing::debug!("Unmounted page {}", self.page_id);
        }
    }

    /// Pick the content to render on mount.
    ///
    /// The chosen content becomes the capture baseline.
    pub async fn load_initial_state(&self) -> Result<LoadedPage> {
        let record = self.fetch_remote().await?;
        let draft = self.drafts.get(&self.page_id)?;
        let source = choose_source(record.updated_at, draft.as_deref());
        let local_updated_at = draft.as_ref().map(|draft| draft.updated_at);

        let loaded = match (source, draft) {
            (Source::Local, Some(draft)) => LoadedPage {
                page_id: self.page_id,
                content: draft.content.clone(),
                name: draft.name.clone(),
                source,
                remote_updated_at: record.updated_at,
                local_updated_at,
            },
            _ => LoadedPage::from_remote(record, local_updated_at),
        };

        {
            let mut state = self.lock()?;
            state.baseline = Some(Snapshot {
                content: loaded.content.clone(),
                name: loaded.name.clone(),
            });
            state.last_remote_updated_at = Some(loaded.remote_updated_at);
        }

        tracing::info!(
            "Loaded page {} from {} copy ({} elements)",
            self.page_id,
            loaded.source.as_str(),
            loaded.content.len()
        );
        Ok(loaded)
    }

    /// Persist a snapshot if it differs from the last capture.
    ///
    /// The draft is written locally before the remote write is issued. The
    /// remote write runs on its own task so dropping this future does not
    /// cancel it.
    pub async fn capture_and_persist(
        &self,
        content: PageContent,
        name: &str,
    ) -> Result<CaptureOutcome> {
        if !self.is_mounted() {
            return Ok(CaptureOutcome::Detached);
        }

        let baseline = {
            let mut state = self.lock()?;
            if !state.save_state.is_idle() {
                tracing::debug!(
                    "Capture for page {} dropped: {}",
                    self.page_id,
                    state.save_state.label()
                );
                return Ok(CaptureOutcome::Skipped);
            }
            state.save_state = SaveState::Capturing;
            state.baseline.take()
        };

        let snapshot = Snapshot {
            content,
            name: name.to_string(),
        };
        let draft = match self.stage_draft(baseline.as_ref(), &snapshot) {
            Ok(Some(draft)) => draft,
            Ok(None) => {
                self.settle(baseline)?;
                return Ok(CaptureOutcome::Unchanged);
            }
            Err(error) => {
                self.settle(baseline)?;
                return Err(error);
            }
        };

        {
            let mut state = self.lock()?;
            state.baseline = Some(snapshot);
            state.save_state = SaveState::AwaitingRemoteAck;
        }

        let local_updated_at = draft.updated_at;
        let result = self.push_remote(draft).await;

        if !self.is_mounted() {
            tracing::debug!(
                "Page {} unmounted before its remote write settled",
                self.page_id
            );
            return Ok(CaptureOutcome::Detached);
        }

        match result {
            Ok(remote_updated_at) => {
                self.bus.publish(Invalidation::PageMetadata(self.page_id));
                tracing::info!("Saved page {} at {}", self.page_id, remote_updated_at);
                Ok(CaptureOutcome::Saved {
                    local_updated_at,
                    remote_updated_at,
                })
            }
            Err(source) => {
                tracing::warn!(
                    "Remote save of page {} failed; draft kept locally: {}",
                    self.page_id,
                    source
                );
                Err(Error::Write {
                    page_id: self.page_id,
                    source,
                })
            }
        }
    }

    /// Replace the view with the remote copy.
    ///
    /// A draft strictly newer than the remote is only discarded when
    /// `discard_newer_local` is set.
    pub async fn manual_refresh(&self, discard_newer_local: bool) -> Result<RefreshOutcome> {
        {
            let mut state = self.lock()?;
            if !state.save_state.is_idle() {
                return Ok(RefreshOutcome::Busy);
            }
            state.save_state = SaveState::Refreshing;
        }
        let _refreshing = RefreshGuard(self.state.as_ref());

        let record = self.fetch_remote().await?;
        let draft = self.drafts.get(&self.page_id)?;

        if !discard_newer_local && draft_is_newer(record.updated_at, draft.as_deref()) {
            let local_updated_at = draft.map_or(record.updated_at, |draft| draft.updated_at);
            tracing::info!(
                "Refresh of page {} needs confirmation: local draft is newer",
                self.page_id
            );
            return Ok(RefreshOutcome::ConfirmationRequired {
                local_updated_at,
                remote_updated_at: record.updated_at,
            });
        }

        self.drafts.set(LocalDraft::from_record(&record))?;
        {
            let mut state = self.lock()?;
            state.baseline = Some(Snapshot {
                content: record.content.clone(),
                name: record.name.clone(),
            });
            state.last_remote_updated_at = Some(record.updated_at);
        }

        tracing::info!("Refreshed page {} from remote", self.page_id);
        let local_updated_at = Some(record.updated_at);
        Ok(RefreshOutcome::Refreshed(LoadedPage::from_remote(
            record,
            local_updated_at,
        )))
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>> {
        self.state
            .lock()
            .map_err(|_| Error::Database("page session lock poisoned".to_string()))
    }

    /// Return to `Idle`, restoring the baseline taken for comparison
    fn settle(&self, baseline: Option<Snapshot>) -> Result<()> {
        let mut state = self.lock()?;
        if state.baseline.is_none() {
            state.baseline = baseline;
        }
        state.save_state = SaveState::Idle;
        Ok(())
    }

    async fn fetch_remote(&self) -> Result<PageRecord> {
        self.remote
            .get_page(&self.page_id)
            .await
            .map_err(|source| Error::Load {
                page_id: self.page_id,
                source,
            })
    }

    /// Write the draft when the snapshot changed; `None` when it did not
    fn stage_draft(
        &self,
        baseline: Option<&Snapshot>,
        snapshot: &Snapshot,
    ) -> Result<Option<Arc<LocalDraft>>> {
        let unchanged = match baseline {
            Some(baseline) => baseline.matches(&snapshot.content, &snapshot.name),
            None => self
                .drafts
                .get(&self.page_id)?
                .is_some_and(|draft| {
                    draft.name == snapshot.name && draft.content == snapshot.content
                }),
        };
        if unchanged {
            return Ok(None);
        }

        let draft = self.drafts.set(LocalDraft::new(
            self.page_id,
            snapshot.name.clone(),
            snapshot.content.clone(),
            self.clock.now_millis(),
        ))?;
        tracing::debug!(
            "Cached draft of page {} at {}",
            self.page_id,
            draft.updated_at
        );
        Ok(Some(draft))
    }

    async fn push_remote(&self, draft: Arc<LocalDraft>) -> std::result::Result<i64, RemoteError> {
        let remote = Arc::clone(&self.remote);
        let state = Arc::clone(&self.state);
        let page_id = self.page_id;

        let write = tokio::spawn(async move {
            let result = remote.set_page(&page_id, &draft.content, &draft.name).await;
            if let Ok(mut state) = state.lock() {
                state.save_state = SaveState::Idle;
                if let Ok(remote_updated_at) = &result {
                    state.last_remote_updated_at = Some(*remote_updated_at);
                }
            }
            result
        });

        match write.await {
            Ok(result) => result,
            Err(join_error) => {
                if let Ok(mut state) = self.state.lock() {
                    state.save_state = SaveState::Idle;
                }
                Err(RemoteError::Api(format!("remote write task failed: {join_error}")))
            }
        }
    }
}
