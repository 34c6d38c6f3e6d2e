use std::io;

use thiserror::Error;

use crate::config_profiles::ProfileFileError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] drawbook_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Profile(#[from] ProfileFileError),
    #[error("Page ID cannot be empty")]
    EmptyPageId,
    #[error("Invalid page ID: {0}")]
    InvalidPageId(String),
    #[error("Invalid folder ID: {0}")]
    InvalidFolderId(String),
    #[error("{0}")]
    AmbiguousId(String),
    #[error("Folder not found: {0}")]
    FolderNotFound(String),
    #[error("Search query cannot be empty")]
    EmptySearchQuery,
    #[error("Scene file {0} does not exist")]
    MissingSceneFile(String),
    #[error(
        "Local draft from {local} is newer than the server copy from {remote}. \
         Re-run with --yes to discard it."
    )]
    RefreshNeedsConfirmation { local: String, remote: String },
    #[error("A save is in progress for this page; try again")]
    PageBusy,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Remote is not configured. Run `drawbook config init` and set DRAWBOOK_ACCESS_TOKEN."
    )]
    RemoteNotConfigured,
}
