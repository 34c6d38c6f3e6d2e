//! Shared save-state types.

/// Per-page autosave state while an editor is mounted.
///
/// Transitions: `Idle -> Capturing -> AwaitingRemoteAck -> Idle`, and
/// `Idle -> Refreshing -> Idle` for a manual refresh. Triggers arriving in any
/// state other than `Idle` are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveState {
    #[default]
    Idle,
    Capturing,
    AwaitingRemoteAck,
    Refreshing,
}

impl SaveState {
    /// Whether a new capture may start.
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Short label for status output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::AwaitingRemoteAck => "saving",
            Self::Refreshing => "refreshing",
        }
    }
}
