//! Folder model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FolderId(Uuid);

impl FolderId {
    /// Create a new unique folder ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for FolderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FolderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// A named, iconified grouping of pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    /// Emoji icon; empty when none was picked
    pub icon: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last metadata change (Unix ms)
    pub updated_at: i64,
}

/// Folder metadata kept in the local cache between sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedFolder {
    pub folder_id: FolderId,
    pub name: String,
    pub owner_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CachedFolder {
    #[must_use]
    pub fn from_folder(folder: &Folder, owner_id: &str) -> Self {
        Self {
            folder_id: folder.id,
            name: folder.name.clone(),
            owner_id: owner_id.to_string(),
            created_at: folder.created_at,
            updated_at: folder.updated_at,
        }
    }
}

/// Validate and trim a folder name
pub fn normalize_folder_name(name: &str) -> crate::Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(crate::Error::InvalidInput(
            "Folder name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_id_parse() {
        let id = FolderId::new();
        let parsed: FolderId = format!(" {id} ").parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn normalize_folder_name_trims_and_rejects_blank() {
        assert_eq!(normalize_folder_name("  Sketches ").unwrap(), "Sketches");
        assert!(normalize_folder_name(" \t").is_err());
    }
}
