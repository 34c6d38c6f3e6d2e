use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use drawbook_core::autosave::{PageSnapshot, SnapshotSource};
use drawbook_core::diagram::{DiagramConverter, JsonElementsConverter};
use drawbook_core::PageContent;

/// A JSON file on disk standing in for the live canvas.
///
/// Every snapshot re-reads the file, so edits made by another program are
/// picked up on the next autosave tick.
#[derive(Debug, Clone)]
pub struct SceneFileSource {
    path: PathBuf,
    name: String,
}

impl SceneFileSource {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSource for SceneFileSource {
    fn snapshot(&self) -> drawbook_core::Result<Option<PageSnapshot>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        // Editors often truncate before writing.
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let elements = JsonElementsConverter
            .convert(&raw)
            .map_err(|error| drawbook_core::Error::Diagram(error.to_string()))?;
        Ok(Some(PageSnapshot {
            content: PageContent::new(elements),
            name: self.name.clone(),
        }))
    }
}
