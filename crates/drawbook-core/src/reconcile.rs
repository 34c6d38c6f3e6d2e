//! Last-writer-wins choice between a remote record and a local draft.

use serde::{Deserialize, Serialize};

use crate::models::LocalDraft;

/// Which copy of a page is authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Local,
    Remote,
}

impl Source {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Remote wins only when there is no draft or it is strictly newer.
///
/// Equal timestamps keep the draft.
#[must_use]
pub fn choose_source(remote_updated_at: i64, draft: Option<&LocalDraft>) -> Source {
    match draft {
        Some(draft) if draft.updated_at >= remote_updated_at => Source::Local,
        _ => Source::Remote,
    }
}

/// Whether a draft holds work the remote has not seen
#[must_use]
pub fn draft_is_newer(remote_updated_at: i64, draft: Option<&LocalDraft>) -> bool {
    draft.is_some_and(|draft| draft.updated_at > remote_updated_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageContent, PageId};

    fn draft_at(updated_at: i64) -> LocalDraft {
        LocalDraft::new(PageId::new(), "draft", PageContent::empty(), updated_at)
    }

    #[test]
    fn missing_draft_means_remote() {
        assert_eq!(choose_source(10, None), Source::Remote);
    }

    #[test]
    fn newer_side_wins() {
        assert_eq!(choose_source(10, Some(&draft_at(11))), Source::Local);
        assert_eq!(choose_source(12, Some(&draft_at(11))), Source::Remote);
    }

    #[test]
    fn tie_prefers_local() {
        assert_eq!(choose_source(10, Some(&draft_at(10))), Source::Local);
        assert!(!draft_is_newer(10, Some(&draft_at(10))));
    }
}
