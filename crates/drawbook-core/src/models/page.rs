//! Page model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::FolderId;

/// A unique identifier for a page, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(Uuid);

impl PageId {
    /// Create a new unique page ID using UUID v7
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

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

/// Serialized canvas content: an ordered sequence of drawing elements.
///
/// Elements are opaque JSON values owned by the drawing library. Equality is
/// deep structural equality, so key order inside an element never matters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageContent(Vec<Value>);

impl PageContent {
    /// Wrap a list of drawing elements
    #[must_use]
    pub const fn new(elements: Vec<Value>) -> Self {
        Self(elements)
    }

    /// Empty canvas
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Borrow the raw elements
    #[must_use]
    pub fn elements(&self) -> &[Value] {
        &self.0
    }

    /// Consume into the raw elements
    #[must_use]
    pub fn into_elements(self) -> Vec<Value> {
        self.0
    }

    /// Number of elements, including ones the drawing library marked deleted
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the canvas has no elements at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Count elements not flagged with `"isDeleted": true`
    #[must_use]
    pub fn visible_len(&self) -> usize {
        self.0
            .iter()
            .filter(|element| {
                !element
                    .get("isDeleted")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            })
            .count()
    }

    /// Serialize to a compact JSON array
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    /// Parse from a JSON array
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

impl From<Vec<Value>> for PageContent {
    fn from(elements: Vec<Value>) -> Self {
        Self(elements)
    }
}

/// A page as stored by the remote record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Stable identifier
    pub id: PageId,
    /// Display name
    pub name: String,
    /// Canvas content
    pub content: PageContent,
    /// Last remote write (Unix ms)
    pub updated_at: i64,
    /// Owning folder, if any
    pub folder_id: Option<FolderId>,
}

/// Page metadata as shown in listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub id: PageId,
    pub name: String,
    pub updated_at: i64,
    pub folder_id: Option<FolderId>,
}

impl From<&PageRecord> for PageSummary {
    fn from(record: &PageRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            updated_at: record.updated_at,
            folder_id: record.folder_id,
        }
    }
}

/// Trim a page name; blank names fall back to `"Untitled"`
#[must_use]
pub fn display_page_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        "Untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_id_unique() {
        assert_ne!(PageId::new(), PageId::new());
    }

    #[test]
    fn test_page_id_parse() {
        let id = PageId::new();
        let parsed: PageId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<PageId>().is_err());
    }

    #[test]
    fn content_equality_ignores_key_order() {
        let a: PageContent =
            PageContent::from_json_str(r#"[{"id":"a","x":1,"y":2}]"#).unwrap();
        let b: PageContent =
            PageContent::from_json_str(r#"[{"y":2,"id":"a","x":1}]"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn content_equality_respects_element_order() {
        let a = PageContent::new(vec![json!({"id": "a"}), json!({"id": "b"})]);
        let b = PageContent::new(vec![json!({"id": "b"}), json!({"id": "a"})]);
        assert_ne!(a, b);
    }

    #[test]
    fn visible_len_skips_deleted_elements() {
        let content = PageContent::new(vec![
            json!({"id": "a", "isDeleted": false}),
            json!({"id": "b", "isDeleted": true}),
            json!({"id": "c"}),
        ]);
        assert_eq!(content.len(), 3);
        assert_eq!(content.visible_len(), 2);
    }

    #[test]
    fn display_page_name_falls_back() {
        assert_eq!(display_page_name("  "), "Untitled");
        assert_eq!(display_page_name(" Roadmap "), "Roadmap");
    }
}
