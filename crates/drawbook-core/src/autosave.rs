//! Periodic autosave for a mounted page.
//!
//! The task ticks on a fixed interval, asks the editor for a snapshot and
//! hands it to [`PageSession::capture_and_persist`]. It is started on mount
//! and stopped on unmount through [`AutosaveHandle::stop`].

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::AutosaveConfig;
use crate::models::PageContent;
use crate::session::{CaptureOutcome, PageSession};
use crate::Result;

/// What the editor currently shows
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    pub content: PageContent,
    pub name: String,
}

/// Supplies snapshots of the live canvas
pub trait SnapshotSource: Send + Sync + 'static {
    /// Current snapshot; `None` when the editor has nothing to offer yet
    fn snapshot(&self) -> Result<Option<PageSnapshot>>;
}

/// Outcome of one autosave tick, for the presentation layer to surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutosaveEvent {
    Saved {
        local_updated_at: i64,
        remote_updated_at: i64,
    },
    Unchanged,
    Skipped,
    Failed(String),
    Stopped,
}

/// Running autosave task
pub struct AutosaveHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    events: mpsc::UnboundedReceiver<AutosaveEvent>,
    session: PageSession,
}

impl AutosaveHandle {
    #[must_use]
    pub const fn session(&self) -> &PageSession {
        &self.session
    }

    /// Next tick outcome; `None` once the task has exited
    pub async fn next_event(&mut self) -> Option<AutosaveEvent> {
        self.events.recv().await
    }

    /// Unmount the session, cancel the task and wait for it to exit.
    ///
    /// Returns events not yet consumed, ending with [`AutosaveEvent::Stopped`].
    pub async fn stop(mut self) -> Vec<AutosaveEvent> {
        self.session.unmount();
        let _ = self.shutdown.send(true);
        if let Err(error) = (&mut self.task).await {
            tracing::warn!(
                "Autosave task for page {} ended abnormally: {error}",
                self.session.page_id()
            );
        }

        let mut remaining = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            remaining.push(event);
        }
        remaining
    }
}

/// Spawn the autosave loop for a mounted session
pub fn spawn_autosave<S: SnapshotSource>(
    session: PageSession,
    source: S,
    config: AutosaveConfig,
) -> AutosaveHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let (events_tx, events) = mpsc::unbounded_channel();
    let task_session = session.clone();

    tracing::info!(
        "Autosave for page {} every {} ms",
        session.page_id(),
        config.interval.as_millis()
    );

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately; the page was just loaded.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {}
            }

            let snapshot = match source.snapshot() {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => continue,
                Err(error) => {
                    tracing::warn!("Could not snapshot page {}: {error}", task_session.page_id());
                    let _ = events_tx.send(AutosaveEvent::Failed(error.to_string()));
                    continue;
                }
            };

            let outcome = tokio::select! {
                _ = shutdown_rx.changed() => break,
                outcome = task_session
                    .capture_and_persist(snapshot.content, &snapshot.name) => outcome,
            };

            let event = match outcome {
                Ok(CaptureOutcome::Saved {
                    local_updated_at,
                    remote_updated_at,
                }) => AutosaveEvent::Saved {
                    local_updated_at,
                    remote_updated_at,
                },
                Ok(CaptureOutcome::Unchanged) => AutosaveEvent::Unchanged,
                Ok(CaptureOutcome::Skipped) => AutosaveEvent::Skipped,
                Ok(CaptureOutcome::Detached) => break,
                Err(error) => {
                    tracing::warn!("Autosave failed: {error}");
                    AutosaveEvent::Failed(error.to_string())
                }
            };
            if events_tx.send(event).is_err() {
                break;
            }
        }

        tracing::debug!("Autosave for page {} stopped", task_session.page_id());
        let _ = events_tx.send(AutosaveEvent::Stopped);
    });

    AutosaveHandle {
        shutdown,
        task,
        events,
        session,
    }
}
