//! drawbook-core - Core library for drawbook
//!
//! This crate contains the page and folder models, the local draft cache,
//! the remote record store interface, and the autosave reconciliation used
//! by every drawbook interface.

pub mod autosave;
pub mod config;
pub mod db;
pub mod diagram;
pub mod drafts;
pub mod error;
pub mod export;
pub mod folders;
pub mod invalidation;
pub mod listing;
pub mod models;
pub mod pages;
pub mod reconcile;
pub mod remote;
pub mod search;
pub mod services;
pub mod session;
pub mod state;
pub mod util;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use models::{Folder, FolderId, LocalDraft, PageContent, PageId, PageRecord, PageSummary};
pub use session::{CaptureOutcome, LoadedPage, PageSession, Reconciler, RefreshOutcome};
